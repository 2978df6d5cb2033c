use super::Writer;
use anyhow::Context;
use ingest_sdk::Record;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const PARTITION_SIZE: usize = 50000;

/// Writes one JSON object per record.
///
/// Named records become objects keyed by field name; records without names
/// are keyed by column index.
pub struct JsonlWriter {
    writer: BufWriter<Box<dyn Write + Send>>,
    buffer: Vec<Value>,
    partition_size: usize,
    path: Option<PathBuf>, // Removed on close when nothing was written
    records_written: usize,
}

impl JsonlWriter {
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file '{}'", path.display()))?;
        Ok(Self::with_sink(Box::new(file), Some(path.to_path_buf())))
    }

    pub fn stdout() -> Self {
        Self::with_sink(Box::new(io::stdout()), None)
    }

    fn with_sink(sink: Box<dyn Write + Send>, path: Option<PathBuf>) -> Self {
        Self {
            writer: BufWriter::new(sink),
            buffer: Vec::new(),
            partition_size: PARTITION_SIZE,
            path,
            records_written: 0,
        }
    }

    pub fn with_partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size.max(1);
        self
    }

    pub fn records_written(&self) -> usize {
        self.records_written + self.buffer.len()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        // One write per partition
        let mut output = String::with_capacity(self.buffer.len() * 128);
        for value in &self.buffer {
            output.push_str(&serde_json::to_string(value)?);
            output.push('\n');
        }

        self.writer.write_all(output.as_bytes())?;
        self.records_written += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }
}

impl Writer for JsonlWriter {
    fn write_record(&mut self, record: &Record) -> anyhow::Result<()> {
        self.buffer.push(record.to_json_object());
        if self.buffer.len() >= self.partition_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) -> anyhow::Result<bool> {
        self.flush()?;
        self.writer.flush()?;
        let has_data = self.records_written > 0;

        if !has_data {
            if let Some(path) = self.path.take() {
                drop(self.writer);
                let _ = std::fs::remove_file(&path);
            }
        }

        Ok(has_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut writer = Box::new(JsonlWriter::create(&path).unwrap().with_partition_size(1));

        let names: Arc<[String]> = vec!["name".to_string(), "age".to_string()].into();
        let named = Record::new("marko,29", names, vec!["marko".into(), "29".into()]).unwrap();
        writer.write_record(&named).unwrap();
        writer
            .write_record(&Record::values_only("a b", vec!["a".into(), "b".into()]))
            .unwrap();
        assert_eq!(writer.records_written(), 2);
        assert!(writer.close().unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, [r#"{"name":"marko","age":"29"}"#, r#"{"0":"a","1":"b"}"#]);
    }

    #[test]
    fn empty_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        let writer = Box::new(JsonlWriter::create(&path).unwrap());
        assert!(!writer.close().unwrap());
        assert!(!path.exists());
    }
}
