//! The compiled filter document handed to a document-store driver

use crate::errors::CompileError;
use crate::value::ObjectRef;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value as JsonValue};

pub const AND_KEY: &str = "$and";
pub const OR_KEY: &str = "$or";

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    ObjectRef(ObjectRef),
    Document(FilterDocument),
    List(Vec<FilterDocument>),
}

impl FilterValue {
    /// Extended JSON rendering: `{"$oid": ..}` for references, `{"$date": ..}` for dates
    pub fn to_json(&self) -> JsonValue {
        match self {
            FilterValue::String(s) => JsonValue::String(s.clone()),
            FilterValue::Number(n) => number_to_json(*n),
            FilterValue::Bool(b) => JsonValue::Bool(*b),
            FilterValue::Date(d) => {
                json!({ "$date": d.to_rfc3339_opts(SecondsFormat::Millis, true) })
            }
            FilterValue::ObjectRef(id) => json!({ "$oid": id.to_hex() }),
            FilterValue::Document(doc) => doc.to_json(),
            FilterValue::List(docs) => {
                JsonValue::Array(docs.iter().map(FilterDocument::to_json).collect())
            }
        }
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

/// Insertion-ordered mapping; equality ignores key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDocument {
    entries: IndexMap<String, FilterValue>,
}

impl FilterDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: impl Into<String>, value: FilterValue) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(key.into(), value);
        Self { entries }
    }

    /// A single-key document `{key: [docs...]}`
    pub fn combinator(key: &str, docs: Vec<FilterDocument>) -> Self {
        Self::with_entry(key, FilterValue::List(docs))
    }

    /// Inserts a new key; an existing key is a collision, never overwritten
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: FilterValue,
    ) -> Result<(), CompileError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(CompileError::FieldCollision { key });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// True when any top-level key is `$and` or `$or`
    pub fn has_combinator(&self) -> bool {
        self.entries.contains_key(AND_KEY) || self.entries.contains_key(OR_KEY)
    }

    pub fn is_disjoint(&self, other: &FilterDocument) -> bool {
        other.keys().all(|key| !self.entries.contains_key(key))
    }

    /// Flat merge of two documents with disjoint keys
    pub fn merge(mut self, other: FilterDocument) -> Result<Self, CompileError> {
        for (key, value) in other.entries {
            self.insert(key, value)?;
        }
        Ok(self)
    }

    /// Takes the list out of a `{key: [..]}` document; other shapes come back unchanged
    pub fn into_combinator_list(mut self, key: &str) -> Result<Vec<FilterDocument>, Self> {
        if self.entries.len() == 1 && matches!(self.entries.get(key), Some(FilterValue::List(_))) {
            if let Some(FilterValue::List(docs)) = self.entries.swap_remove(key) {
                return Ok(docs);
            }
        }
        Err(self)
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Serialize for FilterDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for FilterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl std::fmt::Display for FilterDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
