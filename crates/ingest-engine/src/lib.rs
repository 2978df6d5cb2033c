pub mod fs;
pub mod io;
pub mod parser;
pub mod spec;

pub use fs::{ObjectStoreFileSystem, RemoteConfig, RemoteFileSystem, RemotePath};
pub use io::{InputReader, ReaderFactory, Records, SourceVariant};
pub use spec::{Compression, FileFormat, SourceDescriptor, SourceKind};
