#![allow(dead_code)]

use query_filter::{Config, QueryError, QueryParser};
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; `RUST_LOG=query_filter=trace` shows the pipeline
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config(fields: &[&str]) -> Config {
    Config::with_default_fields(fields.iter().map(|f| f.to_string()).collect())
}

pub fn parse_json(query: &str, config: &Config) -> JsonValue {
    init_tracing();
    match query_filter::parse(query, config) {
        Ok(doc) => doc.to_json(),
        Err(err) => panic!("query {:?} failed: {}", query, err),
    }
}

pub fn parse_err(query: &str, config: &Config) -> QueryError {
    init_tracing();
    match QueryParser::new(config.clone()).parse(query) {
        Ok(doc) => panic!("query {:?} unexpectedly compiled to {}", query, doc),
        Err(err) => err,
    }
}
