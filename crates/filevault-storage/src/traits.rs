//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Size of the chunks yielded by [`Storage::open_stream`].
pub const STREAM_CHUNK_SIZE: usize = 32 * 1024;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy, single-pass sequence of object bytes.
///
/// Dropping the stream releases the underlying file handle or HTTP connection.
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait. The file
/// manager only ever talks to a `dyn Storage` chosen at startup.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create the bucket if it does not exist yet. Safe to call repeatedly.
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Check whether the bucket exists and is reachable.
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Write the whole reader to `bucket/key` and return the key.
    ///
    /// The bucket is created first when missing. The content length does not need to
    /// be known upfront; the reader is consumed until EOF.
    async fn save(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<String>;

    /// Read the full object into memory.
    async fn read_all(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// Open the object as a stream of chunks of at most [`STREAM_CHUNK_SIZE`] bytes.
    async fn open_stream(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream>;

    /// Generate a time-limited direct URL for GET access.
    ///
    /// Does not check that the object exists.
    async fn presign(&self, bucket: &str, key: &str, expires_in: Duration)
        -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
