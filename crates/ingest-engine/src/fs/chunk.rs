use super::{RemoteFileSystem, RemotePath};
use crate::io::codec::ByteStream;
use bytes::Bytes;
use ingest_sdk::Result;
use parquet::errors::ParquetError;
use parquet::file::reader::{ChunkReader, Length};
use std::sync::Arc;

/// Random access to a remote file for the columnar reader.
///
/// Every chunk request becomes a ranged read against the filesystem client.
pub struct RemoteChunkReader {
    fs: Arc<dyn RemoteFileSystem>,
    path: RemotePath,
    len: u64,
}

impl RemoteChunkReader {
    pub fn new(fs: Arc<dyn RemoteFileSystem>, path: RemotePath) -> Result<Self> {
        let len = fs.file_len(&path)?;
        Ok(Self { fs, path, len })
    }
}

impl Length for RemoteChunkReader {
    fn len(&self) -> u64 {
        self.len
    }
}

impl ChunkReader for RemoteChunkReader {
    type T = ByteStream;

    fn get_read(&self, start: u64) -> parquet::errors::Result<Self::T> {
        self.fs
            .open_at(&self.path, start)
            .map_err(|e| ParquetError::External(Box::new(e)))
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        self.fs
            .read_range(&self.path, start, length)
            .map_err(|e| ParquetError::External(Box::new(e)))
    }
}
