use super::lines::{ByteStreamOpener, LineRecordSource};
use super::SourceReader;
use crate::fs::{ObjectStoreFileSystem, RemoteConfig, RemoteFileSystem, RemotePath};
use crate::io::codec::ByteStream;
use crate::spec::SourceDescriptor;
use ingest_sdk::{LoadError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Reader for line-oriented files on a remote filesystem
pub type RemoteFileReader = SourceReader<LineRecordSource<RemoteFileOpener>>;

impl RemoteFileReader {
    pub fn new(source: Arc<SourceDescriptor>, config: RemoteConfig) -> Self {
        SourceReader::from_source(LineRecordSource::new(source, RemoteFileOpener::new(config)))
    }

    pub fn with_filesystem(source: Arc<SourceDescriptor>, fs: Arc<dyn RemoteFileSystem>) -> Self {
        SourceReader::from_source(LineRecordSource::new(
            source,
            RemoteFileOpener::with_filesystem(fs),
        ))
    }
}

/// Connects to the remote filesystem and keeps the client and resolved path
/// for the lifetime of the reader.
pub struct RemoteFileOpener {
    config: RemoteConfig,
    fs: Option<Arc<dyn RemoteFileSystem>>,
    path: Option<RemotePath>,
}

impl RemoteFileOpener {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            fs: None,
            path: None,
        }
    }

    /// Use an already connected client instead of building one from configuration
    pub fn with_filesystem(fs: Arc<dyn RemoteFileSystem>) -> Self {
        Self {
            config: RemoteConfig::default(),
            fs: Some(fs),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&RemotePath> {
        self.path.as_ref()
    }

    /// Connect (once) and resolve the source path, checking it names a file.
    pub fn connect(
        &mut self,
        source: &SourceDescriptor,
    ) -> Result<(Arc<dyn RemoteFileSystem>, RemotePath)> {
        let fs = match &self.fs {
            Some(fs) => Arc::clone(fs),
            None => {
                let fs: Arc<dyn RemoteFileSystem> = Arc::new(
                    ObjectStoreFileSystem::connect(&source.path, &self.config)
                        .map_err(|e| e.into_init("Failed to create load file system"))?,
                );
                self.fs = Some(Arc::clone(&fs));
                fs
            }
        };

        let path = fs.resolve(&source.path)?;
        check_path(fs.as_ref(), &path)?;
        self.path = Some(path.clone());
        Ok((fs, path))
    }
}

impl ByteStreamOpener for RemoteFileOpener {
    fn open(&mut self, source: &SourceDescriptor) -> Result<ByteStream> {
        info!(path = %source.path, "Opening remote file");
        let (fs, path) = self.connect(source)?;
        fs.open(&path)
    }

    fn close(&mut self) {
        self.path = None;
        if let Some(fs) = self.fs.take() {
            if let Err(e) = fs.close() {
                warn!(error = %e, "Failed to close remote filesystem client");
            }
        }
    }
}

fn check_path(fs: &dyn RemoteFileSystem, path: &RemotePath) -> Result<()> {
    if !fs.exists(path)? {
        return Err(LoadError::init(format!(
            "Please ensure the remote file exist: '{}'",
            path
        )));
    }
    if !fs.is_file(path)? {
        return Err(LoadError::init(format!(
            "Please ensure the remote path is a file instead of a directory: '{}'",
            path
        )));
    }
    Ok(())
}
