//! AST types for the query language

use crate::value::Value;

/// How a free-text term was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Plain,
    Quoted,
    Wildcard,
    Regex,
}

/// A bare term whose field is resolved later from the default fields
#[derive(Debug, Clone, PartialEq)]
pub struct TextTerm {
    pub term: String,
    pub kind: TextKind,
}

impl TextTerm {
    pub fn new(term: impl Into<String>, kind: TextKind) -> Self {
        Self {
            term: term.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `path:value`; `path` is kept in dot notation as written
    Field { path: String, value: Value },
    Text(TextTerm),
    /// Operands of an `AND` chain, flattened as the chain is built
    And(Vec<Node>),
    /// Operands of an `OR` chain, flattened as the chain is built
    Or(Vec<Node>),
    Not(Box<Node>),
    /// Conjunction that always compiles to its own `$and` list
    AllOf(Vec<Node>),
    /// Disjunction that always compiles to its own `$or` list
    AnyOf(Vec<Node>),
}

impl Node {
    pub fn field(path: impl Into<String>, value: Value) -> Self {
        Node::Field {
            path: path.into(),
            value,
        }
    }

    /// Joins two operands with `AND`, extending either side that is already an `And`
    pub fn and(left: Node, right: Node) -> Self {
        let mut operands = match left {
            Node::And(operands) => operands,
            other => vec![other],
        };
        match right {
            Node::And(more) => operands.extend(more),
            other => operands.push(other),
        }
        Node::And(operands)
    }

    pub fn or(left: Node, right: Node) -> Self {
        let mut operands = match left {
            Node::Or(operands) => operands,
            other => vec![other],
        };
        match right {
            Node::Or(more) => operands.extend(more),
            other => operands.push(other),
        }
        Node::Or(operands)
    }

    pub fn not(inner: Node) -> Self {
        Node::Not(Box::new(inner))
    }

    /// Builds an `AllOf`, splicing operands that are themselves `AllOf`
    pub fn all_of(operands: Vec<Node>) -> Self {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Node::AllOf(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Node::AllOf(flat)
    }

    pub fn any_of(operands: Vec<Node>) -> Self {
        Node::AnyOf(operands)
    }
}

fn write_list(f: &mut std::fmt::Formatter<'_>, op: &str, items: &[Node]) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Field { path, value } => write!(f, "{}:{}", path, value),
            Node::Text(text) => match text.kind {
                TextKind::Plain | TextKind::Wildcard => write!(f, "{}", text.term),
                TextKind::Quoted => write!(f, "{:?}", text.term),
                TextKind::Regex => write!(f, "/{}/", text.term),
            },
            Node::And(operands) => write_list(f, "AND", operands),
            Node::Or(operands) => write_list(f, "OR", operands),
            Node::Not(inner) => write!(f, "NOT {}", inner),
            Node::AllOf(items) => write_list(f, "ALL", items),
            Node::AnyOf(items) => write_list(f, "ANY", items),
        }
    }
}
