//! Object storage abstraction traits
//!
//! `BlobStore` is the read surface the object storage tier needs; `BlobStoreProvider`
//! resolves the configured connection into a store on demand.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use vellum_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unusable connection settings. Fatal for externally stored content.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_config_error(&self) -> bool {
        matches!(self, StorageError::ConfigError(_))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            StorageError::NotFound(key) => AppError::NotFound(format!("Blob not found: {}", key)),
            StorageError::IoError(e) => AppError::Transfer(format!("IO error: {}", e)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Stream of blob bytes in source order.
pub type BlobStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Read access to one object storage container.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Container name, for diagnostics.
    fn container(&self) -> &str;

    /// Whether the configured container exists.
    ///
    /// `Ok(false)` means the container is definitely absent; errors mean the answer
    /// could not be obtained.
    async fn container_exists(&self) -> StorageResult<bool>;

    /// Length in bytes of the blob, or `None` if it does not exist.
    async fn content_length(&self, key: &str) -> StorageResult<Option<u64>>;

    /// Open the blob for sequential reading.
    async fn get_stream(&self, key: &str) -> StorageResult<BlobStream>;
}

/// Resolves the configured object storage connection.
#[async_trait]
pub trait BlobStoreProvider: Send + Sync {
    /// Connect to the configured container.
    ///
    /// Missing or malformed settings are reported as [`StorageError::ConfigError`].
    async fn connect(&self) -> StorageResult<Arc<dyn BlobStore>>;
}
