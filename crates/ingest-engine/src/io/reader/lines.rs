use super::RecordSource;
use crate::io::codec::{self, ByteStream};
use crate::io::line::LineSupplier;
use crate::parser::{self, LineParser, LinePull};
use crate::spec::SourceDescriptor;
use ingest_sdk::{LoadError, RawLine, Record, Result};
use std::sync::Arc;
use tracing::debug;

/// Opens the raw byte stream of a line-oriented source.
pub trait ByteStreamOpener {
    fn open(&mut self, source: &SourceDescriptor) -> Result<ByteStream>;

    /// Release handles kept alongside the stream
    fn close(&mut self) {}
}

/// Line supplier plus comment skipping
pub struct LineCursor {
    supplier: LineSupplier,
    source: Arc<SourceDescriptor>,
}

impl LineCursor {
    pub fn new(supplier: LineSupplier, source: Arc<SourceDescriptor>) -> Self {
        Self { supplier, source }
    }

    pub fn close(&mut self) {
        self.supplier.close();
    }
}

impl LinePull for LineCursor {
    fn pull(&mut self) -> Result<Option<RawLine>> {
        while let Some(line) = self.supplier.next_line()? {
            if self.source.is_comment_line(&line.text) {
                continue;
            }
            return Ok(Some(line));
        }
        Ok(None)
    }
}

/// Record source shared by every line-oriented reader; only opening the
/// byte stream differs between them.
pub struct LineRecordSource<O: ByteStreamOpener> {
    descriptor: Arc<SourceDescriptor>,
    opener: O,
    cursor: Option<LineCursor>,
    parser: Option<Box<dyn LineParser>>,
}

impl<O: ByteStreamOpener> LineRecordSource<O> {
    pub fn new(descriptor: Arc<SourceDescriptor>, opener: O) -> Self {
        Self {
            descriptor,
            opener,
            cursor: None,
            parser: None,
        }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    fn open_lines(&mut self) -> Result<LineCursor> {
        let source = Arc::clone(&self.descriptor);
        source.validate()?;
        codec::ensure_line_oriented(source.compression)?;

        let stream = self.opener.open(&source)?;
        let chars = codec::decode(source.compression, &source.charset, stream)?;
        Ok(LineCursor::new(LineSupplier::new(chars), source))
    }
}

impl<O: ByteStreamOpener> RecordSource for LineRecordSource<O> {
    fn init(&mut self) -> Result<()> {
        let path = self.descriptor.path.clone();
        let init_error = |e: LoadError| e.into_init(format!("Failed to load input in path '{}'", path));

        let cursor = self.open_lines().map_err(init_error)?;
        let cursor = self.cursor.insert(cursor);

        let mut parser = parser::create(&self.descriptor).map_err(init_error)?;
        parser.init(cursor).map_err(init_error)?;
        debug!(path = %self.descriptor.path, format = ?self.descriptor.format, "Initialized line reader");
        self.parser = Some(parser);
        Ok(())
    }

    fn fetch(&mut self) -> Result<Option<Record>> {
        let (Some(cursor), Some(parser)) = (self.cursor.as_mut(), self.parser.as_ref()) else {
            return Err(LoadError::Internal(
                "Line reader is not initialized".to_string(),
            ));
        };
        match cursor.pull()? {
            Some(line) => parser.parse(line).map(Some),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        self.parser = None;
        self.opener.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reader::{InputReader, SourceReader};
    use crate::spec::{Compression, FileFormat};
    use std::io::Cursor;

    /// Serves a fixed buffer and records how often it was asked to open
    #[derive(Default)]
    struct BufferOpener {
        data: Vec<u8>,
        opened: usize,
        closed: usize,
    }

    impl ByteStreamOpener for BufferOpener {
        fn open(&mut self, _source: &SourceDescriptor) -> Result<ByteStream> {
            self.opened += 1;
            Ok(Box::new(Cursor::new(self.data.clone())))
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    fn reader(
        source: SourceDescriptor,
        text: &str,
    ) -> SourceReader<LineRecordSource<BufferOpener>> {
        let opener = BufferOpener {
            data: text.as_bytes().to_vec(),
            ..Default::default()
        };
        SourceReader::from_source(LineRecordSource::new(Arc::new(source), opener))
    }

    #[test]
    fn skips_comments_and_consumes_header() {
        let source = SourceDescriptor::file("person.csv", FileFormat::Csv)
            .with_comment_symbols(["#"]);
        let mut reader = reader(source, "# comment\na,b,c\n1,2,3\n");
        reader.init().unwrap();

        assert!(reader.has_next().unwrap());
        let record = reader.next().unwrap();
        assert_eq!(record.names(), ["a", "b", "c"]);
        assert_eq!(record.values(), ["1", "2", "3"]);
        assert!(!reader.has_next().unwrap());
    }

    #[test]
    fn long_comment_runs_are_skipped_iteratively() {
        let mut text = "#\n".repeat(100_000);
        text.push_str("payload\n");
        let source =
            SourceDescriptor::file("log.txt", FileFormat::Text).with_comment_symbols(["#"]);
        let mut reader = reader(source, &text);
        reader.init().unwrap();
        assert_eq!(reader.next().unwrap().raw(), "payload");
        assert!(!reader.has_next().unwrap());
    }

    #[test]
    fn columnar_compression_fails_before_opening() {
        let source = SourceDescriptor::file("person.orc", FileFormat::Csv)
            .with_compression(Compression::Columnar);
        let mut reader = reader(source, "");
        let err = reader.init().unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));
        assert_eq!(reader.source().opener().opened, 0);
        assert_eq!(reader.source().opener().closed, 1);
    }

    #[test]
    fn corrupt_compressed_input_fails_on_read() {
        let source = SourceDescriptor::file("person.csv.gz", FileFormat::Text)
            .with_compression(Compression::Gzip);
        let mut reader = reader(source, "definitely not gzip\n");
        reader.init().unwrap();
        assert!(matches!(reader.has_next(), Err(LoadError::Io { .. })));
    }

    #[test]
    fn header_read_failure_is_init_error() {
        let source = SourceDescriptor::file("person.csv.gz", FileFormat::Csv)
            .with_compression(Compression::Gzip);
        let mut reader = reader(source, "definitely not gzip\n");
        assert!(matches!(reader.init(), Err(LoadError::Init { .. })));
        assert_eq!(reader.source().opener().closed, 1);
    }

    #[test]
    fn fetch_before_init_is_internal_error() {
        let mut source = LineRecordSource::new(
            Arc::new(SourceDescriptor::file("a.txt", FileFormat::Text)),
            BufferOpener::default(),
        );
        assert!(matches!(source.fetch(), Err(LoadError::Internal(_))));
    }
}
