//! Resolves free-text terms against the configured default fields

use crate::ast::{Node, TextKind, TextTerm};
use crate::config::Config;
use crate::errors::ConfigError;
use crate::normalize::negate;
use crate::value::{infer_regex, RegexPattern, Value};

pub struct Expander<'a> {
    default_fields: &'a [String],
}

impl<'a> Expander<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            default_fields: &config.default_fields,
        }
    }

    /// Returns a new tree with every `Text` leaf replaced by field matches.
    ///
    /// Expects a normalized tree; negated text is negated again after its
    /// fields are resolved, so the result contains no `Not` nodes.
    pub fn expand(&self, node: &Node) -> Result<Node, ConfigError> {
        match node {
            Node::Field { .. } => Ok(node.clone()),
            Node::Text(text) => self.expand_text(text),
            Node::Not(inner) => Ok(negate(&self.expand(inner)?)),
            Node::And(operands) => Ok(Node::And(self.expand_all(operands)?)),
            Node::Or(operands) => Ok(Node::Or(self.expand_all(operands)?)),
            Node::AllOf(items) => Ok(Node::all_of(self.expand_all(items)?)),
            Node::AnyOf(items) => Ok(Node::any_of(self.expand_all(items)?)),
        }
    }

    fn expand_all(&self, items: &[Node]) -> Result<Vec<Node>, ConfigError> {
        items.iter().map(|item| self.expand(item)).collect()
    }

    fn expand_text(&self, text: &TextTerm) -> Result<Node, ConfigError> {
        let value = match text.kind {
            TextKind::Plain | TextKind::Quoted => {
                Value::Regex(RegexPattern::exact_insensitive(&text.term))
            }
            TextKind::Wildcard => Value::Wildcard(text.term.clone()),
            TextKind::Regex => infer_regex(&text.term),
        };
        tracing::trace!(term = %text.term, fields = ?self.default_fields, "expanding free text");

        match self.default_fields {
            [] => Err(ConfigError::NoDefaultFields {
                term: text.term.clone(),
            }),
            [field] => Ok(Node::field(field.clone(), value)),
            fields => Ok(Node::any_of(
                fields
                    .iter()
                    .map(|field| Node::field(field.clone(), value.clone()))
                    .collect(),
            )),
        }
    }
}
