//! Remote filesystem access used by the remote and columnar readers.

use crate::io::codec::ByteStream;
use bytes::Bytes;
use ingest_sdk::{LoadError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::info;

pub mod chunk;
pub mod store;

pub use chunk::RemoteChunkReader;
pub use store::ObjectStoreFileSystem;

/// Environment variable naming the directory with remote filesystem configuration
pub const CONF_DIR_ENV: &str = "INGEST_REMOTE_CONF_DIR";

/// A path resolved against a remote filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    uri: String,
    location: String,
}

impl RemotePath {
    pub fn new(uri: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            location: location.into(),
        }
    }

    /// The path as the user wrote it
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The key of the object inside its filesystem
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Blocking client for a remote filesystem.
///
/// A directory is a path that has children but no object of its own.
pub trait RemoteFileSystem: Send + Sync {
    fn resolve(&self, path: &str) -> Result<RemotePath>;

    fn exists(&self, path: &RemotePath) -> Result<bool>;

    fn is_file(&self, path: &RemotePath) -> Result<bool>;

    fn open(&self, path: &RemotePath) -> Result<ByteStream> {
        self.open_at(path, 0)
    }

    /// Open a stream that starts `offset` bytes into the file
    fn open_at(&self, path: &RemotePath, offset: u64) -> Result<ByteStream>;

    fn file_len(&self, path: &RemotePath) -> Result<u64>;

    fn read_range(&self, path: &RemotePath, start: u64, length: usize) -> Result<Bytes>;

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Options handed to the remote filesystem client, e.g. credentials or endpoints.
///
/// Deployments provide them as YAML files in the directory named by
/// [`CONF_DIR_ENV`]; files are merged in name order, later keys win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    options: BTreeMap<String, String>,
}

impl RemoteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the configuration provided by the deployment
    pub fn load() -> Result<Self> {
        match std::env::var(CONF_DIR_ENV) {
            Ok(dir) => {
                info!(dir = %dir, "Loading remote filesystem configuration");
                Self::from_dir(dir)
            }
            Err(_) => {
                info!("{} is not set, using default remote filesystem configuration", CONF_DIR_ENV);
                Ok(Self::default())
            }
        }
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            LoadError::init_with(
                format!("Failed to read remote configuration directory {:?}", dir),
                e,
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| LoadError::init_with("Failed to list remote configuration", e))?
                .path();
            let is_yaml = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml") | Some("yml")
            );
            if is_yaml && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut config = Self::default();
        for file in files {
            let content = std::fs::read_to_string(&file).map_err(|e| {
                LoadError::init_with(format!("Failed to read remote configuration {:?}", file), e)
            })?;
            config.merge_yaml(&content).map_err(|e| {
                LoadError::init_with(format!("Invalid remote configuration {:?}", file), e)
            })?;
        }
        Ok(config)
    }

    /// Merge a flat YAML mapping of scalar options
    pub fn merge_yaml(&mut self, content: &str) -> Result<()> {
        let values: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(content)
            .map_err(|e| LoadError::init_with("Remote configuration must be a mapping", e))?;
        for (key, value) in values {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                other => {
                    return Err(LoadError::Unsupported(format!(
                        "Remote configuration option '{}' must be a scalar, got {:?}",
                        key, other
                    )))
                }
            };
            self.options.insert(key, value);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
