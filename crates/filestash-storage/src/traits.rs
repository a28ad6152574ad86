//! Storage abstraction trait
//!
//! Blob stores hold file contents under flat keys (one path component each). Writes
//! never overwrite: an existing key is reported as [`StorageError::AlreadyExists`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file contents, read lazily from the backend.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `key`. Fails with `AlreadyExists` if the key is taken; the
    /// existing object is left untouched.
    async fn write_create_only(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Open an object for streaming. `NotFound` if it is absent.
    async fn open_read(&self, key: &str) -> StorageResult<ByteStream>;

    /// Remove an object. `NotFound` if it is absent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Cheap readiness probe used by the health endpoint.
    async fn ping(&self) -> StorageResult<()>;

    fn backend_name(&self) -> &'static str;
}
