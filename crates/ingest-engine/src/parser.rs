use crate::spec::{FileFormat, SourceDescriptor};
use ingest_sdk::{RawLine, Record, Result};

pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::CsvLineParser;
pub use self::json::JsonLineParser;
pub use self::text::TextLineParser;

/// Pulls the next data line (comment lines already skipped) from a reader.
///
/// Handed to [`LineParser::init`] so a parser can consume a header line
/// before the first record is produced.
pub trait LinePull {
    fn pull(&mut self) -> Result<Option<RawLine>>;
}

/// Turns one raw line into a structured record
pub trait LineParser {
    /// Called once, after the line supplier is open and before the first `parse`.
    fn init(&mut self, _lines: &mut dyn LinePull) -> Result<()> {
        Ok(())
    }

    fn parse(&self, line: RawLine) -> Result<Record>;
}

/// Create the parser for the source's declared format
pub fn create(source: &SourceDescriptor) -> Result<Box<dyn LineParser>> {
    let parser: Box<dyn LineParser> = match source.format {
        FileFormat::Csv => Box::new(CsvLineParser::new(source)?),
        FileFormat::Text => Box::new(TextLineParser::new()),
        FileFormat::Json => Box::new(JsonLineParser),
    };
    Ok(parser)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::LinePull;
    use ingest_sdk::{RawLine, Result};
    use std::collections::VecDeque;

    /// In-memory line source for parser tests
    pub struct VecLines(VecDeque<RawLine>);

    impl VecLines {
        pub fn new(lines: &[&str]) -> Self {
            Self(
                lines
                    .iter()
                    .enumerate()
                    .map(|(idx, text)| RawLine::new(*text, idx + 1))
                    .collect(),
            )
        }

        pub fn remaining(&self) -> usize {
            self.0.len()
        }
    }

    impl LinePull for VecLines {
        fn pull(&mut self) -> Result<Option<RawLine>> {
            Ok(self.0.pop_front())
        }
    }
}
