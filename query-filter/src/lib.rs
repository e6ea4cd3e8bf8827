//! Lucene-style query strings compiled to document-store filter documents.
//!
//! ```text
//! status:active AND age:>=18   =>  {"status": "active", "age": {"$gte": 18}}
//! NOT (a:1 OR b:2)             =>  {"$and": [{"a": {"$ne": 1}}, {"b": {"$ne": 2}}]}
//! ```
//!
//! The pipeline is lexer, parser, negation normalizer, default-field
//! expander and formatter. Every stage is a pure function of its input and
//! the read-only [`Config`].

pub mod ast;
pub mod config;
pub mod document;
pub mod errors;
pub mod expand;
pub mod formatter;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod value;

use std::sync::Arc;

pub use ast::{Node, TextKind, TextTerm};
pub use config::Config;
pub use document::{FilterDocument, FilterValue};
pub use errors::{CompileError, ConfigError, LexError, QueryError, SyntaxError};
pub use formatter::CANONICAL_ID_FIELD;
pub use parser::MAX_NESTING;
pub use value::{ObjectRef, RegexPattern, Value};

use expand::Expander;
use formatter::Formatter;
use parser::Parser;

/// A reusable parser; cloning shares the configuration
#[derive(Debug, Clone)]
pub struct QueryParser {
    config: Arc<Config>,
    text_search: bool,
}

impl QueryParser {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            text_search: true,
        }
    }

    /// With `false`, bare free-text terms fail with [`ConfigError::TextSearchDisabled`]
    pub fn with_text_search(mut self, enabled: bool) -> Self {
        self.text_search = enabled;
        self
    }

    /// Parses and normalizes `query` without expanding free text or compiling
    pub fn parse_ast(&self, query: &str) -> Result<Option<Node>, QueryError> {
        let tokens = lexer::tokenize(query)?;
        tracing::debug!(tokens = tokens.len(), "tokenized query");

        let ast = Parser::new(tokens, self.text_search).parse()?;
        if let Some(node) = &ast {
            tracing::debug!(ast = %node, "parsed query");
        }
        Ok(ast.map(|node| normalize::normalize(&node)))
    }

    pub fn parse(&self, query: &str) -> Result<FilterDocument, QueryError> {
        let normalized = self.parse_ast(query)?;
        let expanded = match normalized {
            Some(node) => {
                let expanded = Expander::new(&self.config).expand(&node)?;
                tracing::debug!(ast = %expanded, "expanded free text");
                Some(expanded)
            }
            None => None,
        };
        Ok(Formatter::new(&self.config).format(expanded.as_ref())?)
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// One-shot parse with a borrowed configuration
pub fn parse(query: &str, config: &Config) -> Result<FilterDocument, QueryError> {
    QueryParser::new(config.clone()).parse(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_query_parser_is_send_sync() {
        assert_send_sync::<QueryParser>();
        assert_send_sync::<FilterDocument>();
    }

    #[test]
    fn test_empty_query() {
        let parser = QueryParser::default();
        assert!(parser.parse("").unwrap().is_empty());
        assert!(parser.parse("   \t ").unwrap().is_empty());
        assert_eq!(parser.parse_ast("  ").unwrap(), None);
    }

    #[test]
    fn test_parse_ast_is_normalized() {
        let parser = QueryParser::default();
        assert_eq!(
            parser.parse_ast("NOT a:1").unwrap(),
            Some(Node::field("a", Value::Ne(Box::new(Value::Number(1.0)))))
        );
    }

    #[test]
    fn test_free_function_matches_parser() {
        let config = Config::with_default_fields(vec!["title".to_string()]);
        let query = "rust AND lang:en";
        assert_eq!(
            parse(query, &config).unwrap(),
            QueryParser::new(config).parse(query).unwrap()
        );
    }

    #[test]
    fn test_text_search_disabled() {
        let parser = QueryParser::new(Config::with_default_fields(vec!["title".to_string()]))
            .with_text_search(false);
        assert!(matches!(
            parser.parse("hello"),
            Err(QueryError::Config(ConfigError::TextSearchDisabled { .. }))
        ));
        assert_eq!(parser.parse("a:1").unwrap().to_json(), json!({"a": 1}));
    }

    #[test]
    fn test_concurrent_parses_share_config() {
        let parser = QueryParser::new(Config::with_default_fields(vec![
            "title".to_string(),
            "body".to_string(),
        ]));
        let queries = [
            "a:1 AND b:2",
            "NOT (a:1 OR b:2)",
            "hello world",
            "id:507f1f77bcf86cd799439011",
        ];
        let expected: Vec<_> = queries.iter().map(|q| parser.parse(q).unwrap()).collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = queries
                .iter()
                .map(|query| {
                    let parser = parser.clone();
                    scope.spawn(move || parser.parse(query).unwrap())
                })
                .collect();
            for (handle, expected) in handles.into_iter().zip(&expected) {
                assert_eq!(&handle.join().unwrap(), expected);
            }
        });
    }
}
