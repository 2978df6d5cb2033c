use super::LineParser;
use ingest_sdk::{LoadError, RawLine, Record, Result};
use serde_json::Value;

/// One JSON object per line; field names are the object's keys in document order.
pub struct JsonLineParser;

impl LineParser for JsonLineParser {
    fn parse(&self, line: RawLine) -> Result<Record> {
        if line.text.trim().is_empty() {
            return Err(LoadError::parse(line.line_no, line.text, "Empty line"));
        }

        let map = match serde_json::from_str::<Value>(&line.text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(LoadError::parse(
                    line.line_no,
                    line.text,
                    "Expected a JSON object",
                ))
            }
            Err(e) => {
                return Err(LoadError::parse(
                    line.line_no,
                    line.text,
                    format!("Failed to parse JSON: {}", e),
                ))
            }
        };

        let mut names = Vec::with_capacity(map.len());
        let mut values = Vec::with_capacity(map.len());
        for (name, value) in map {
            names.push(name);
            values.push(value);
        }
        Record::new(line.text, names.into(), values)
    }
}
