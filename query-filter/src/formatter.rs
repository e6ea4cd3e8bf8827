//! Compiles a normalized, expanded AST into a [`FilterDocument`]
//!
//! `AND` of plain field documents with distinct keys merges into one flat
//! document; otherwise it becomes a `$and` list. `OR` always becomes a `$or`
//! list. Chains of the same operator share one list.

use crate::ast::Node;
use crate::config::Config;
use crate::document::{FilterDocument, FilterValue, AND_KEY, OR_KEY};
use crate::errors::CompileError;
use crate::value::{ObjectRef, RegexPattern, Value};

/// The store's reserved primary-key field
pub const CANONICAL_ID_FIELD: &str = "_id";

/// User-facing alias rewritten to [`CANONICAL_ID_FIELD`]
const ID_ALIAS: &str = "id";

const ID_SUFFIX: &str = "_id";

fn is_identity_field(key: &str) -> bool {
    key == CANONICAL_ID_FIELD || key.ends_with(ID_SUFFIX)
}

fn regex_document(re: &RegexPattern) -> FilterValue {
    let mut doc = FilterDocument::with_entry("$regex", FilterValue::String(re.pattern.clone()));
    if let Some(options) = re.options() {
        // fresh document, "$options" cannot collide
        let _ = doc.insert("$options", FilterValue::String(options.to_string()));
    }
    FilterValue::Document(doc)
}

fn is_conjunction(node: &Node) -> bool {
    matches!(node, Node::And(_) | Node::AllOf(_))
}

/// Appends an `AND` operand, splicing its `$and` list when it is itself a conjunction
fn push_and_operand(conjunction: bool, doc: FilterDocument, items: &mut Vec<FilterDocument>) {
    if !conjunction {
        items.push(doc);
        return;
    }
    match doc.into_combinator_list(AND_KEY) {
        Ok(list) => items.extend(list),
        Err(doc) => items.push(doc),
    }
}

/// Running result of an `AND` chain
enum Conjunction {
    /// Plain field documents merged so far; `bool` marks a spliceable conjunction
    Flat(FilterDocument, bool),
    List(Vec<FilterDocument>),
}

pub struct Formatter<'a> {
    config: &'a Config,
}

impl<'a> Formatter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// An empty query compiles to the empty (match-all) document
    pub fn format(&self, node: Option<&Node>) -> Result<FilterDocument, CompileError> {
        let doc = match node {
            Some(node) => self.compile(node)?,
            None => FilterDocument::new(),
        };
        tracing::debug!(keys = doc.len(), "compiled filter document");
        Ok(doc)
    }

    pub fn compile(&self, node: &Node) -> Result<FilterDocument, CompileError> {
        match node {
            Node::Field { path, value } => self.compile_field(path, value),
            Node::And(operands) => self.compile_and(operands),
            Node::Or(operands) => {
                let mut items = Vec::with_capacity(operands.len());
                self.collect_or(operands, &mut items)?;
                Ok(FilterDocument::combinator(OR_KEY, items))
            }
            Node::AllOf(operands) => {
                let mut items = Vec::with_capacity(operands.len());
                for operand in operands {
                    let doc = self.compile(operand)?;
                    push_and_operand(is_conjunction(operand), doc, &mut items);
                }
                Ok(FilterDocument::combinator(AND_KEY, items))
            }
            Node::AnyOf(operands) => {
                let items = operands
                    .iter()
                    .map(|operand| self.compile(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FilterDocument::combinator(OR_KEY, items))
            }
            Node::Text(text) => Err(CompileError::UnsupportedValue(format!(
                "free-text term '{}' was not expanded",
                text.term
            ))),
            Node::Not(inner) => Err(CompileError::UnsupportedValue(format!(
                "negation of '{}' was not normalized",
                inner
            ))),
        }
    }

    /// Operands that are themselves `Or` share the enclosing list
    fn collect_or(
        &self,
        operands: &[Node],
        items: &mut Vec<FilterDocument>,
    ) -> Result<(), CompileError> {
        for operand in operands {
            match operand {
                Node::Or(nested) => self.collect_or(nested, items)?,
                other => items.push(self.compile(other)?),
            }
        }
        Ok(())
    }

    /// Folds left to right: disjoint plain documents merge, anything else
    /// turns the result into one `$and` list
    fn compile_and(&self, operands: &[Node]) -> Result<FilterDocument, CompileError> {
        let mut state: Option<Conjunction> = None;
        for operand in operands {
            let doc = self.compile(operand)?;
            let conjunction = is_conjunction(operand);
            state = Some(match state {
                None => Conjunction::Flat(doc, conjunction),
                Some(Conjunction::Flat(acc, _))
                    if !acc.has_combinator()
                        && !doc.has_combinator()
                        && acc.is_disjoint(&doc) =>
                {
                    Conjunction::Flat(acc.merge(doc)?, true)
                }
                Some(Conjunction::Flat(acc, acc_conjunction)) => {
                    let mut items = Vec::new();
                    push_and_operand(acc_conjunction, acc, &mut items);
                    push_and_operand(conjunction, doc, &mut items);
                    Conjunction::List(items)
                }
                Some(Conjunction::List(mut items)) => {
                    push_and_operand(conjunction, doc, &mut items);
                    Conjunction::List(items)
                }
            });
        }

        Ok(match state {
            None => FilterDocument::new(),
            Some(Conjunction::Flat(doc, _)) => doc,
            Some(Conjunction::List(items)) => FilterDocument::combinator(AND_KEY, items),
        })
    }

    fn compile_field(&self, path: &str, value: &Value) -> Result<FilterDocument, CompileError> {
        let key = if path == ID_ALIAS && self.config.replace_id_with_canonical_id {
            CANONICAL_ID_FIELD
        } else {
            path
        };
        let identity = self.config.auto_convert_id_to_object_ref && is_identity_field(key);
        Ok(FilterDocument::with_entry(key, self.compile_operand(value, identity)?))
    }

    fn compile_operand(&self, value: &Value, identity: bool) -> Result<FilterValue, CompileError> {
        match value {
            Value::Str(_)
            | Value::Number(_)
            | Value::Bool(_)
            | Value::Date(_)
            | Value::ObjectRef(_) => self.scalar(value, identity),
            Value::Wildcard(pattern) => Ok(regex_document(&RegexPattern::from_wildcard(pattern))),
            Value::Regex(re) => Ok(regex_document(re)),
            Value::Range { lo, hi } => {
                let mut doc = FilterDocument::new();
                if let Some(lo) = lo {
                    doc.insert("$gte", self.scalar(lo, identity)?)?;
                }
                if let Some(hi) = hi {
                    doc.insert("$lte", self.scalar(hi, identity)?)?;
                }
                if doc.is_empty() {
                    return Err(CompileError::UnsupportedValue(
                        "range without bounds".to_string(),
                    ));
                }
                Ok(FilterValue::Document(doc))
            }
            Value::Comparison { op, value } => Ok(FilterValue::Document(FilterDocument::with_entry(
                op.filter_key(),
                self.scalar(value, identity)?,
            ))),
            Value::Ne(inner) => Ok(FilterValue::Document(FilterDocument::with_entry(
                "$ne",
                self.compile_operand(inner, identity)?,
            ))),
            Value::Not(inner) => Ok(FilterValue::Document(FilterDocument::with_entry(
                "$not",
                self.compile_operand(inner, identity)?,
            ))),
        }
    }

    /// Identity fields turn 24-hex strings into references; anything else stays a string
    fn scalar(&self, value: &Value, identity: bool) -> Result<FilterValue, CompileError> {
        match value {
            Value::Str(s) if identity => Ok(match s.parse::<ObjectRef>() {
                Ok(id) => FilterValue::ObjectRef(id),
                Err(_) => FilterValue::String(s.clone()),
            }),
            Value::Str(s) => Ok(FilterValue::String(s.clone())),
            Value::Number(n) => Ok(FilterValue::Number(*n)),
            Value::Bool(b) => Ok(FilterValue::Bool(*b)),
            Value::Date(d) => Ok(FilterValue::Date(*d)),
            Value::ObjectRef(id) => Ok(FilterValue::ObjectRef(*id)),
            other => Err(CompileError::UnsupportedValue(format!(
                "{} cannot be used as a scalar operand",
                other
            ))),
        }
    }
}
