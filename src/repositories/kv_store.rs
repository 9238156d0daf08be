use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Key holding every user's custom categories and overrides
pub const CATEGORIES_KEY: &str = "categories";

/// Key holding the device's cached IP fingerprint
pub const CURRENT_IP_KEY: &str = "currentIP";

/// Key holding one user's IP security record
pub fn ip_security_key(user_id: &str) -> String {
    format!("ipSecurity_{}", user_id)
}

/// Errors raised by a key-value backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("Failed to write '{key}': {message}")]
    Write { key: String, message: String },
}

/// Repository errors for typed access on top of the key-value store
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage read failed: {0}")]
    ReadFailed(String),

    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Read { .. } => RepositoryError::ReadFailed(err.to_string()),
            StoreError::Write { .. } => RepositoryError::WriteFailed(err.to_string()),
        }
    }
}

/// String blobs addressed by string keys.
///
/// Only single `get` and `set` calls are atomic; callers that read, modify
/// and write a key must serialize on it themselves.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was stored
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local store, contents are lost on exit
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|value| value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store keeping one JSON file per key under a root directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root directory if needed
    pub async fn initialize(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Key-value store initialized at: {:?}", self.root);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`. Bytes outside `[A-Za-z0-9_.-]` are percent-encoded
    /// so user ids cannot escape the root directory.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => {
                    file_name.push(byte as char)
                }
                b'.' if !file_name.is_empty() => file_name.push('.'),
                _ => file_name.push_str(&format!("%{:02X}", byte)),
            }
        }
        file_name.push_str(".json");
        self.root.join(file_name)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);

        match fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::debug!("Read key '{}' ({} bytes)", key, content.len());
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let write_error = |e: std::io::Error| StoreError::Write {
            key: key.to_string(),
            message: e.to_string(),
        };

        fs::create_dir_all(&self.root).await.map_err(write_error)?;

        // Write to temp file first, then rename over the old value
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(write_error)?;
        file.write_all(value.as_bytes()).await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        fs::rename(&temp_path, &path).await.map_err(write_error)?;

        tracing::debug!("Wrote key '{}' ({} bytes)", key, value.len());
        Ok(())
    }
}
