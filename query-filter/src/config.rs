use serde::{Deserialize, Serialize};

/// Options shared read-only by every parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Fields searched by free-text terms, in order; empty rejects free text
    #[serde(default)]
    pub default_fields: Vec<String>,
    /// Rewrite the `id` key to the canonical identity field
    #[serde(default = "default_true")]
    pub replace_id_with_canonical_id: bool,
    /// Convert 24-hex strings on identity fields to object references
    #[serde(default = "default_true")]
    pub auto_convert_id_to_object_ref: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_fields: Vec::new(),
            replace_id_with_canonical_id: default_true(),
            auto_convert_id_to_object_ref: default_true(),
        }
    }
}

impl Config {
    pub fn with_default_fields(default_fields: Vec<String>) -> Self {
        Self {
            default_fields,
            ..Self::default()
        }
    }
}
