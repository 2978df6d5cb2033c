use super::{RemoteConfig, RemoteFileSystem, RemotePath};
use crate::io::codec::ByteStream;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use ingest_sdk::{LoadError, Result};
use object_store::path::Path;
use object_store::{GetOptions, GetRange, ObjectStore};
use std::io::{self, Read};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;
use url::Url;

/// [`RemoteFileSystem`] backed by an `object_store` store.
///
/// Async store calls are driven to completion on a runtime owned by the client.
pub struct ObjectStoreFileSystem {
    store: Arc<dyn ObjectStore>,
    runtime: Arc<Runtime>,
}

impl ObjectStoreFileSystem {
    /// Connect to the store that serves `uri`, e.g. `s3://bucket/key` or `file:///data/x.csv`
    pub fn connect(uri: &str, config: &RemoteConfig) -> Result<Self> {
        let url = to_url(uri)?;
        let (store, _) = object_store::parse_url_opts(&url, config.options()).map_err(|e| {
            LoadError::init_with(format!("Failed to create load file system for '{}'", uri), e)
        })?;
        Self::with_store(Arc::from(store))
    }

    pub fn with_store(store: Arc<dyn ObjectStore>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| LoadError::init_with("Failed to start remote filesystem runtime", e))?;
        Ok(Self {
            store,
            runtime: Arc::new(runtime),
        })
    }

    fn location(&self, path: &RemotePath) -> Result<Path> {
        Path::parse(path.location()).map_err(|e| {
            LoadError::init_with(format!("Invalid remote path '{}'", path), e)
        })
    }

    fn has_children(&self, location: &Path, path: &RemotePath) -> Result<bool> {
        let listing = self
            .runtime
            .block_on(self.store.list_with_delimiter(Some(location)))
            .map_err(|e| store_error(format!("Failed to list remote path '{}'", path), e))?;
        Ok(!listing.objects.is_empty() || !listing.common_prefixes.is_empty())
    }
}

impl RemoteFileSystem for ObjectStoreFileSystem {
    fn resolve(&self, path: &str) -> Result<RemotePath> {
        let url = to_url(path)?;
        let location = Path::from_url_path(url.path()).map_err(|e| {
            LoadError::init_with(format!("Invalid remote path '{}'", path), e)
        })?;
        Ok(RemotePath::new(path, location.to_string()))
    }

    fn exists(&self, path: &RemotePath) -> Result<bool> {
        let location = self.location(path)?;
        match self.runtime.block_on(self.store.head(&location)) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => self.has_children(&location, path),
            Err(e) => Err(store_error(format!("Failed to check remote path '{}'", path), e)),
        }
    }

    fn is_file(&self, path: &RemotePath) -> Result<bool> {
        let location = self.location(path)?;
        match self.runtime.block_on(self.store.head(&location)) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(store_error(format!("Failed to check remote path '{}'", path), e)),
        }
    }

    fn open_at(&self, path: &RemotePath, offset: u64) -> Result<ByteStream> {
        let location = self.location(path)?;
        let options = GetOptions {
            range: (offset > 0).then(|| GetRange::Offset(offset as usize)),
            ..Default::default()
        };
        let result = self
            .runtime
            .block_on(self.store.get_opts(&location, options))
            .map_err(|e| store_error(format!("Failed to open remote file '{}'", path), e))?;
        Ok(Box::new(ObjectReader::new(
            result.into_stream(),
            Arc::clone(&self.runtime),
        )))
    }

    fn file_len(&self, path: &RemotePath) -> Result<u64> {
        let location = self.location(path)?;
        let meta = self
            .runtime
            .block_on(self.store.head(&location))
            .map_err(|e| store_error(format!("Failed to stat remote file '{}'", path), e))?;
        Ok(meta.size as u64)
    }

    fn read_range(&self, path: &RemotePath, start: u64, length: usize) -> Result<Bytes> {
        let location = self.location(path)?;
        let start = start as usize;
        self.runtime
            .block_on(self.store.get_range(&location, start..start + length))
            .map_err(|e| store_error(format!("Failed to read remote file '{}'", path), e))
    }

    fn close(&self) -> Result<()> {
        debug!(store = %self.store, "Closing remote filesystem client");
        Ok(())
    }
}

fn to_url(uri: &str) -> Result<Url> {
    Url::parse(uri)
        .or_else(|_| Url::from_file_path(uri))
        .map_err(|_| LoadError::init(format!("Invalid remote path '{}'", uri)))
}

fn store_error(message: String, e: object_store::Error) -> LoadError {
    LoadError::io(message, io::Error::new(io::ErrorKind::Other, e))
}

/// Blocking [`Read`] over the chunks of an object stream.
pub struct ObjectReader {
    stream: BoxStream<'static, object_store::Result<Bytes>>,
    chunk: Bytes,
    runtime: Arc<Runtime>,
    done: bool,
}

impl ObjectReader {
    fn new(stream: BoxStream<'static, object_store::Result<Bytes>>, runtime: Arc<Runtime>) -> Self {
        Self {
            stream,
            chunk: Bytes::new(),
            runtime,
            done: false,
        }
    }
}

impl Read for ObjectReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.chunk.is_empty() {
            if self.done {
                return Ok(0);
            }
            match self.runtime.block_on(self.stream.next()) {
                Some(Ok(bytes)) => self.chunk = bytes,
                Some(Err(e)) => return Err(io::Error::new(io::ErrorKind::Other, e)),
                None => self.done = true,
            }
        }
        let n = buf.len().min(self.chunk.len());
        buf[..n].copy_from_slice(&self.chunk[..n]);
        self.chunk = self.chunk.slice(n..);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::PutPayload;

    fn filesystem() -> ObjectStoreFileSystem {
        let store = InMemory::new();
        let fs = ObjectStoreFileSystem::with_store(Arc::new(store)).unwrap();
        fs.runtime
            .block_on(fs.store.put(
                &Path::from("data/person.csv"),
                PutPayload::from_static(b"name,age\nmarko,29\n"),
            ))
            .unwrap();
        fs
    }

    #[test]
    fn resolves_url_paths() {
        let fs = filesystem();
        let path = fs.resolve("memory:///data/person.csv").unwrap();
        assert_eq!(path.location(), "data/person.csv");
        assert_eq!(path.uri(), "memory:///data/person.csv");
    }

    #[test]
    fn distinguishes_files_directories_and_missing_paths() {
        let fs = filesystem();
        let file = fs.resolve("memory:///data/person.csv").unwrap();
        let dir = fs.resolve("memory:///data").unwrap();
        let missing = fs.resolve("memory:///data/software.csv").unwrap();

        assert!(fs.exists(&file).unwrap());
        assert!(fs.is_file(&file).unwrap());
        assert!(fs.exists(&dir).unwrap());
        assert!(!fs.is_file(&dir).unwrap());
        assert!(!fs.exists(&missing).unwrap());
    }

    #[test]
    fn streams_and_ranges_file_contents() {
        let fs = filesystem();
        let file = fs.resolve("memory:///data/person.csv").unwrap();

        let mut all = String::new();
        fs.open(&file).unwrap().read_to_string(&mut all).unwrap();
        assert_eq!(all, "name,age\nmarko,29\n");

        let mut tail = String::new();
        fs.open_at(&file, 9).unwrap().read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "marko,29\n");

        assert_eq!(fs.file_len(&file).unwrap(), 18);
        assert_eq!(&fs.read_range(&file, 0, 4).unwrap()[..], b"name");
    }
}
