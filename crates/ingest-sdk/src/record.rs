use crate::error::{LoadError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// One line of decoded text and the 1-based line number it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub line_no: usize,
}

impl RawLine {
    pub fn new(text: impl Into<String>, line_no: usize) -> Self {
        Self {
            text: text.into(),
            line_no,
        }
    }
}

/// Record is one structured unit produced by a reader.
///
/// It keeps the raw text it was built from for diagnostics, plus an ordered
/// list of field names and the parallel list of values. Field names are shared
/// between records of the same source, so they live behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    raw: String,
    names: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record, checking that names and values line up.
    ///
    /// Either list may be empty; when both are non-empty they must have the
    /// same length.
    pub fn new(raw: impl Into<String>, names: Arc<[String]>, values: Vec<Value>) -> Result<Self> {
        if !names.is_empty() && !values.is_empty() && names.len() != values.len() {
            return Err(LoadError::Internal(format!(
                "Record has {} field names but {} values",
                names.len(),
                values.len()
            )));
        }
        Ok(Self {
            raw: raw.into(),
            names,
            values,
        })
    }

    /// Create a record with positional values only
    pub fn values_only(raw: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            raw: raw.into(),
            names: Arc::from(Vec::new()),
            values,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // --- getters ---
    pub fn get(&self, name: &str) -> Option<&Value> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.values.get(idx)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    /// Render the record as a JSON object keyed by field name.
    ///
    /// Records without field names are keyed by their position (`"0"`, `"1"`, ...).
    pub fn to_json_object(&self) -> Value {
        let mut map = Map::with_capacity(self.values.len());
        if self.names.is_empty() {
            for (idx, value) in self.values.iter().enumerate() {
                map.insert(idx.to_string(), value.clone());
            }
        } else {
            for (name, value) in self.names.iter().zip(self.values.iter()) {
                map.insert(name.clone(), value.clone());
            }
        }
        Value::Object(map)
    }
}
