use super::LineParser;
use ingest_sdk::{RawLine, Record, Result};
use serde_json::Value;
use std::sync::Arc;

/// Field name carried by every free-text record
pub const TEXT_FIELD: &str = "line";

/// Free-text parser: the whole line is the single value.
pub struct TextLineParser {
    names: Arc<[String]>,
}

impl TextLineParser {
    pub fn new() -> Self {
        Self {
            names: Arc::from(vec![TEXT_FIELD.to_string()]),
        }
    }
}

impl Default for TextLineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser for TextLineParser {
    fn parse(&self, line: RawLine) -> Result<Record> {
        let value = Value::String(line.text.clone());
        Record::new(line.text, Arc::clone(&self.names), vec![value])
    }
}
