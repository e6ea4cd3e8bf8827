//! Pushes `NOT` down to the leaves of the tree.
//!
//! Leaf rules:
//! - scalar and comparison values become `Ne(v)`
//! - a wildcard becomes `Ne(Regex(p))`
//! - an explicit regex literal becomes `Not(Regex(p))`
//! - a range becomes `Not(Range)`
//!
//! Compound rules: `NOT (L OR R)` becomes an explicit conjunction of the
//! negated operands, `NOT (L AND R)` stays an `AND` of the negated operands,
//! and `NOT NOT x` is `x`. Free-text leaves cannot be negated until their
//! fields are known, so `Not(Text)` is left for the expander.

use crate::ast::Node;
use crate::value::{RegexPattern, Value};

/// Returns a new tree whose only `Not` nodes wrap free-text leaves
pub fn normalize(node: &Node) -> Node {
    match node {
        Node::Field { .. } | Node::Text(_) => node.clone(),
        Node::And(operands) => Node::And(operands.iter().map(normalize).collect()),
        Node::Or(operands) => Node::Or(operands.iter().map(normalize).collect()),
        Node::AllOf(items) => Node::all_of(items.iter().map(normalize).collect()),
        Node::AnyOf(items) => Node::any_of(items.iter().map(normalize).collect()),
        Node::Not(inner) => match inner.as_ref() {
            Node::Not(twice) => normalize(twice),
            other => negate(&normalize(other)),
        },
    }
}

/// Negates a tree that is already normalized
pub fn negate(node: &Node) -> Node {
    match node {
        Node::Field { path, value } => Node::field(path.clone(), negate_value(value)),
        Node::Text(_) => Node::not(node.clone()),
        Node::Not(inner) => inner.as_ref().clone(),
        Node::And(operands) => Node::And(operands.iter().map(negate).collect()),
        Node::Or(operands) | Node::AnyOf(operands) | Node::AllOf(operands) => {
            Node::all_of(operands.iter().map(negate).collect())
        }
    }
}

pub fn negate_value(value: &Value) -> Value {
    match value {
        Value::Str(_)
        | Value::Number(_)
        | Value::Bool(_)
        | Value::Date(_)
        | Value::ObjectRef(_)
        | Value::Comparison { .. } => Value::Ne(Box::new(value.clone())),
        Value::Wildcard(pattern) => Value::Ne(Box::new(Value::Regex(
            RegexPattern::from_wildcard(pattern),
        ))),
        Value::Regex(_) | Value::Range { .. } => Value::Not(Box::new(value.clone())),
        Value::Ne(inner) | Value::Not(inner) => inner.as_ref().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{TextKind, TextTerm};
    use crate::lexer::Comparator;

    fn num(path: &str, n: f64) -> Node {
        Node::field(path, Value::Number(n))
    }

    fn ne_num(path: &str, n: f64) -> Node {
        Node::field(path, Value::Ne(Box::new(Value::Number(n))))
    }

    #[test]
    fn test_scalar_becomes_ne() {
        assert_eq!(normalize(&Node::not(num("a", 1.0))), ne_num("a", 1.0));
    }

    #[test]
    fn test_wildcard_becomes_ne_regex() {
        let node = Node::not(Node::field("name", Value::Wildcard("jo*".to_string())));
        assert_eq!(
            normalize(&node),
            Node::field(
                "name",
                Value::Ne(Box::new(Value::Regex(RegexPattern {
                    pattern: "^jo.*".to_string(),
                    case_insensitive: false
                })))
            )
        );
    }

    #[test]
    fn test_regex_literal_becomes_not_regex() {
        let re = Value::Regex(RegexPattern::anchored("jo.n"));
        let node = Node::not(Node::field("name", re.clone()));
        assert_eq!(
            normalize(&node),
            Node::field("name", Value::Not(Box::new(re)))
        );
    }

    #[test]
    fn test_comparison_becomes_ne() {
        let cmp = Value::Comparison {
            op: Comparator::Gt,
            value: Box::new(Value::Number(5.0)),
        };
        let node = Node::not(Node::field("age", cmp.clone()));
        assert_eq!(
            normalize(&node),
            Node::field("age", Value::Ne(Box::new(cmp)))
        );
    }

    #[test]
    fn test_not_or_distributes_into_all_of() {
        let node = Node::not(Node::or(num("a", 1.0), num("b", 2.0)));
        assert_eq!(
            normalize(&node),
            Node::AllOf(vec![ne_num("a", 1.0), ne_num("b", 2.0)])
        );
    }

    #[test]
    fn test_not_and_keeps_and() {
        let node = Node::not(Node::and(num("a", 1.0), num("b", 2.0)));
        assert_eq!(
            normalize(&node),
            Node::and(ne_num("a", 1.0), ne_num("b", 2.0))
        );
    }

    #[test]
    fn test_double_negation_cancels() {
        let or = Node::or(num("a", 1.0), num("b", 2.0));
        assert_eq!(normalize(&Node::not(Node::not(or.clone()))), or);
        assert_eq!(
            normalize(&Node::not(Node::not(num("a", 1.0)))),
            num("a", 1.0)
        );
    }

    #[test]
    fn test_nested_or_group_flattens_into_one_all_of() {
        let node = Node::not(Node::Or(vec![
            Node::Or(vec![num("a", 1.0), num("b", 2.0)]),
            num("c", 3.0),
        ]));
        assert_eq!(
            normalize(&node),
            Node::AllOf(vec![ne_num("a", 1.0), ne_num("b", 2.0), ne_num("c", 3.0)])
        );
    }

    #[test]
    fn test_negation_inside_compound() {
        let node = Node::or(Node::not(num("a", 1.0)), num("b", 2.0));
        assert_eq!(normalize(&node), Node::or(ne_num("a", 1.0), num("b", 2.0)));
    }

    #[test]
    fn test_text_negation_is_deferred() {
        let text = Node::Text(TextTerm::new("hello", TextKind::Plain));
        let node = Node::not(text.clone());
        assert_eq!(normalize(&node), Node::not(text));
    }

    #[test]
    fn test_range_becomes_not() {
        let range = Value::Range {
            lo: Some(Box::new(Value::Number(1.0))),
            hi: None,
        };
        assert_eq!(
            negate_value(&range),
            Value::Not(Box::new(range.clone()))
        );
    }

    #[test]
    fn test_long_or_chain_negates_without_nesting() {
        let operands: Vec<Node> = (0..10_000).map(|i| num("a", i as f64)).collect();
        let expected: Vec<Node> = (0..10_000).map(|i| ne_num("a", i as f64)).collect();
        assert_eq!(
            normalize(&Node::not(Node::Or(operands))),
            Node::AllOf(expected)
        );
    }

    #[test]
    fn test_input_tree_is_untouched() {
        let node = Node::not(Node::and(num("a", 1.0), num("b", 2.0)));
        let before = node.clone();
        let _ = normalize(&node);
        assert_eq!(node, before);
    }
}
