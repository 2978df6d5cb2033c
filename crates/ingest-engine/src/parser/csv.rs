use super::{LineParser, LinePull};
use crate::spec::SourceDescriptor;
use ingest_sdk::{LoadError, RawLine, Record, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Delimited-text parser.
///
/// Field names come from the descriptor's explicit header, or from the first
/// data line when the source declares a header line.
pub struct CsvLineParser {
    builder: ::csv::ReaderBuilder,
    header: Option<Arc<[String]>>,
    read_header: bool,
}

impl CsvLineParser {
    pub fn new(source: &SourceDescriptor) -> Result<Self> {
        let mut builder = ::csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(source.delimiter_byte()?);

        let header: Option<Arc<[String]>> = source
            .header
            .as_ref()
            .map(|names| names.iter().cloned().collect());
        let read_header = header.is_none() && source.has_header;

        Ok(Self {
            builder,
            header,
            read_header,
        })
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    fn split(&self, line: &RawLine) -> Result<Vec<String>> {
        if line.text.is_empty() {
            return Err(LoadError::parse(line.line_no, &line.text, "Empty line"));
        }
        let mut reader = self.builder.from_reader(line.text.as_bytes());
        let mut record = ::csv::StringRecord::new();
        match reader.read_record(&mut record) {
            Ok(true) => Ok(record.iter().map(str::to_string).collect()),
            Ok(false) => Err(LoadError::parse(line.line_no, &line.text, "Empty line")),
            Err(e) => Err(LoadError::parse(
                line.line_no,
                &line.text,
                format!("Malformed delimited line: {}", e),
            )),
        }
    }
}

impl LineParser for CsvLineParser {
    fn init(&mut self, lines: &mut dyn LinePull) -> Result<()> {
        if !self.read_header {
            return Ok(());
        }
        if let Some(line) = lines.pull()? {
            let names = self.split(&line)?;
            debug!(line_no = line.line_no, header = ?names, "Consumed header line");
            self.header = Some(names.into());
        }
        Ok(())
    }

    fn parse(&self, line: RawLine) -> Result<Record> {
        let values: Vec<Value> = self.split(&line)?.into_iter().map(Value::String).collect();
        match &self.header {
            Some(header) => {
                if values.len() != header.len() {
                    return Err(LoadError::parse(
                        line.line_no,
                        line.text,
                        format!(
                            "Expected {} columns according to header but found {}",
                            header.len(),
                            values.len()
                        ),
                    ));
                }
                Record::new(line.text, Arc::clone(header), values)
            }
            None => Ok(Record::values_only(line.text, values)),
        }
    }
}
