use super::codec::CharStream;
use ingest_sdk::{LoadError, RawLine, Result};
use std::io::{BufRead, BufReader};

/// Read buffer size for line suppliers; large inputs are the common case.
pub const BUF_SIZE: usize = 5 * 1024 * 1024;

/// Buffered line access over a decoded character stream.
///
/// Owns the stream: closing the supplier (or dropping it) closes the stream
/// and everything it wraps.
pub struct LineSupplier {
    reader: Option<BufReader<CharStream>>,
    line_no: usize,
}

impl LineSupplier {
    pub fn new(stream: CharStream) -> Self {
        Self::with_capacity(BUF_SIZE, stream)
    }

    pub fn with_capacity(capacity: usize, stream: CharStream) -> Self {
        Self {
            reader: Some(BufReader::with_capacity(capacity, stream)),
            line_no: 0,
        }
    }

    /// Next line without its terminator, or `None` at end of input
    pub fn next_line(&mut self) -> Result<Option<RawLine>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut text = String::new();
        let read = reader.read_line(&mut text).map_err(|e| {
            LoadError::io(
                format!("Read next line error after line {}", self.line_no),
                e,
            )
        })?;
        if read == 0 {
            return Ok(None);
        }

        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        self.line_no += 1;
        Ok(Some(RawLine::new(text, self.line_no)))
    }

    /// Number of lines returned so far
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    pub fn close(&mut self) {
        self.reader.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    fn supplier(text: &str) -> LineSupplier {
        LineSupplier::with_capacity(16, Box::new(Cursor::new(text.as_bytes().to_vec())))
    }

    #[test]
    fn yields_lines_with_positions() {
        let mut lines = supplier("a,b\r\n1,2\nlast");
        assert_eq!(lines.next_line().unwrap(), Some(RawLine::new("a,b", 1)));
        assert_eq!(lines.next_line().unwrap(), Some(RawLine::new("1,2", 2)));
        assert_eq!(lines.next_line().unwrap(), Some(RawLine::new("last", 3)));
        assert_eq!(lines.next_line().unwrap(), None);
        assert_eq!(lines.next_line().unwrap(), None);
        assert_eq!(lines.line_no(), 3);
    }

    #[test]
    fn keeps_empty_lines() {
        let mut lines = supplier("\n\nx\n");
        assert_eq!(lines.next_line().unwrap().unwrap().text, "");
        assert_eq!(lines.next_line().unwrap().unwrap().text, "");
        assert_eq!(lines.next_line().unwrap().unwrap().text, "x");
        assert!(lines.next_line().unwrap().is_none());
    }

    #[test]
    fn closed_supplier_reports_end_of_input() {
        let mut lines = supplier("a\nb\n");
        lines.close();
        assert!(lines.is_closed());
        assert!(lines.next_line().unwrap().is_none());
        lines.close();
    }

    struct FailingRead;

    impl Read for FailingRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection reset"))
        }
    }

    #[test]
    fn converts_read_failures() {
        let mut lines = LineSupplier::new(Box::new(FailingRead));
        let err = lines.next_line().unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
