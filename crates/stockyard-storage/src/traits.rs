//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for stockyard_core::AppError {
    fn from(err: StorageError) -> Self {
        stockyard_core::AppError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Asset originals and thumbnails are written through this trait; the returned
/// key is the stable path recorded on the asset.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under the tenant/parent scope and return the storage key.
    async fn save(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        filename: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Read a whole object.
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Read an object as a stream of chunks.
    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
