use crate::fs::{RemoteConfig, RemoteFileSystem};
use crate::spec::{SourceDescriptor, SourceKind};
use ingest_sdk::Result;
use std::sync::Arc;

pub mod codec;
pub mod line;

// Reader trait and implementations
pub mod reader;

pub use reader::{
    columnar::ColumnarReader, local::FileReader, remote::RemoteFileReader, InputReader, Records,
};

// Writer trait and implementations
pub mod writer;

pub use writer::{jsonl::JsonlWriter, Writer};

/// Which reader a source needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceVariant {
    Local,
    Remote,
    Columnar,
}

impl SourceVariant {
    pub fn of(source: &SourceDescriptor) -> Self {
        match source.kind {
            SourceKind::File => SourceVariant::Local,
            SourceKind::Remote if source.compression.is_columnar() => SourceVariant::Columnar,
            SourceKind::Remote => SourceVariant::Remote,
        }
    }
}

/// Factory for creating readers based on source configuration
pub struct ReaderFactory;

impl ReaderFactory {
    /// Create an uninitialized reader for `source`.
    ///
    /// Remote and columnar readers load their filesystem configuration from the deployment.
    pub fn create(source: Arc<SourceDescriptor>) -> Result<Box<dyn InputReader>> {
        source.validate()?;
        let reader: Box<dyn InputReader> = match SourceVariant::of(&source) {
            SourceVariant::Local => Box::new(FileReader::new(source)),
            SourceVariant::Remote => Box::new(RemoteFileReader::new(source, RemoteConfig::load()?)),
            SourceVariant::Columnar => Box::new(ColumnarReader::new(source, RemoteConfig::load()?)),
        };
        Ok(reader)
    }

    /// Like [`ReaderFactory::create`], with remote sources served by `fs`
    pub fn create_with_filesystem(
        source: Arc<SourceDescriptor>,
        fs: Arc<dyn RemoteFileSystem>,
    ) -> Result<Box<dyn InputReader>> {
        source.validate()?;
        let reader: Box<dyn InputReader> = match SourceVariant::of(&source) {
            SourceVariant::Local => Box::new(FileReader::new(source)),
            SourceVariant::Remote => Box::new(RemoteFileReader::with_filesystem(source, fs)),
            SourceVariant::Columnar => Box::new(ColumnarReader::with_filesystem(source, fs)),
        };
        Ok(reader)
    }
}
