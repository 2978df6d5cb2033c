use super::lines::{ByteStreamOpener, LineRecordSource};
use super::SourceReader;
use crate::io::codec::ByteStream;
use crate::spec::SourceDescriptor;
use ingest_sdk::{LoadError, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Reader for files on the local filesystem
pub type FileReader = SourceReader<LineRecordSource<LocalFileOpener>>;

impl FileReader {
    pub fn new(source: Arc<SourceDescriptor>) -> Self {
        SourceReader::from_source(LineRecordSource::new(source, LocalFileOpener))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOpener;

impl ByteStreamOpener for LocalFileOpener {
    fn open(&mut self, source: &SourceDescriptor) -> Result<ByteStream> {
        info!(path = %source.path, "Opening file");
        let path = Path::new(&source.path);
        check_file(path)?;
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => LoadError::init_with(
                format!("Please ensure the file is readable: '{}'", path.display()),
                e,
            ),
            _ => LoadError::init_with(format!("Failed to open file '{}'", path.display()), e),
        })?;
        Ok(Box::new(file))
    }
}

fn check_file(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(LoadError::init(format!(
                "Please ensure the file exist: '{}'",
                path.display()
            )))
        }
        Err(e) => {
            return Err(LoadError::init_with(
                format!("Failed to access file '{}'", path.display()),
                e,
            ))
        }
    };
    if !metadata.is_file() {
        return Err(LoadError::init(format!(
            "Please ensure the file is indeed a file instead of a directory: '{}'",
            path.display()
        )));
    }
    Ok(())
}
