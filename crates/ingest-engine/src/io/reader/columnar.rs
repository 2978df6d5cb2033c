use super::lines::ByteStreamOpener;
use super::remote::RemoteFileOpener;
use super::{RecordSource, SourceReader};
use crate::fs::{RemoteChunkReader, RemoteConfig, RemoteFileSystem};
use crate::spec::SourceDescriptor;
use ingest_sdk::{LoadError, Record, Result};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::reader::RowIter;
use parquet::record::Field;
use std::io;
use std::sync::Arc;
use tracing::{debug, info};

/// Reader for self-describing columnar (Parquet) files on a remote filesystem.
///
/// Rows are read directly from the file; no decompression dispatch, line
/// splitting or line parsing takes place.
pub type ColumnarReader = SourceReader<ColumnarSource>;

impl ColumnarReader {
    pub fn new(source: Arc<SourceDescriptor>, config: RemoteConfig) -> Self {
        SourceReader::from_source(ColumnarSource::new(source, RemoteFileOpener::new(config)))
    }

    pub fn with_filesystem(source: Arc<SourceDescriptor>, fs: Arc<dyn RemoteFileSystem>) -> Self {
        SourceReader::from_source(ColumnarSource::new(
            source,
            RemoteFileOpener::with_filesystem(fs),
        ))
    }
}

pub struct ColumnarSource {
    descriptor: Arc<SourceDescriptor>,
    remote: RemoteFileOpener,
    names: Arc<[String]>,
    rows: Option<RowIter<'static>>,
}

impl ColumnarSource {
    pub fn new(descriptor: Arc<SourceDescriptor>, remote: RemoteFileOpener) -> Self {
        Self {
            descriptor,
            remote,
            names: Arc::from(Vec::new()),
            rows: None,
        }
    }

    fn open(&mut self) -> Result<()> {
        info!(path = %self.descriptor.path, "Opening columnar file");
        let (fs, path) = self.remote.connect(&self.descriptor)?;
        let chunks = RemoteChunkReader::new(fs, path)?;
        let reader = SerializedFileReader::new(chunks)
            .map_err(|e| LoadError::init_with("Failed to read columnar file metadata", e))?;

        self.names = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|field| field.name().to_string())
            .collect();
        debug!(fields = ?self.names, rows = reader.metadata().file_metadata().num_rows(), "Read columnar schema");

        self.rows = Some(RowIter::from_file_into(Box::new(reader)));
        Ok(())
    }

    /// Decode one row's `(name, field)` pairs into the shape produced by the line readers
    fn decode<'a, I>(&self, fields: I, raw: String) -> Result<Record>
    where
        I: IntoIterator<Item = (&'a String, &'a Field)>,
    {
        let mut values = Vec::with_capacity(self.names.len());
        let mut expected = self.names.iter();
        for (name, field) in fields {
            match expected.next() {
                Some(expected) if expected == name => values.push(field.to_json_value()),
                Some(expected) => {
                    return Err(LoadError::Internal(format!(
                        "Columnar row field '{}' does not match schema field '{}'",
                        name, expected
                    )))
                }
                None => {
                    return Err(LoadError::Internal(format!(
                        "Columnar row has more fields than the {} declared by the schema",
                        self.names.len()
                    )))
                }
            }
        }
        if values.len() != self.names.len() {
            return Err(LoadError::Internal(format!(
                "Columnar row has {} fields but the schema declares {}",
                values.len(),
                self.names.len()
            )));
        }

        Record::new(raw, Arc::clone(&self.names), values)
    }
}

impl RecordSource for ColumnarSource {
    fn init(&mut self) -> Result<()> {
        self.open()
            .map_err(|e| e.into_init("Failed to init columnar file reader"))
    }

    fn fetch(&mut self) -> Result<Option<Record>> {
        let rows = self
            .rows
            .as_mut()
            .ok_or_else(|| LoadError::Internal("Columnar reader is not initialized".to_string()))?;
        match rows.next() {
            None => Ok(None),
            Some(Err(e)) => Err(LoadError::io(
                "Read next row error",
                io::Error::new(io::ErrorKind::Other, e),
            )),
            Some(Ok(row)) => {
                let raw = row.to_json_value().to_string();
                self.decode(row.get_column_iter(), raw).map(Some)
            }
        }
    }

    fn close(&mut self) {
        self.rows = None;
        self.remote.close();
    }
}
