use crate::keys::{validate_bucket, validate_key};
use crate::traits::{ObjectStream, Storage, StorageError, StorageResult, STREAM_CHUNK_SIZE};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;

/// Local filesystem storage implementation
///
/// Each bucket is a directory under `base_path`; keys are relative paths inside it.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for bucket directories (e.g., "/var/lib/filevault")
    /// * `base_url` - Base URL of the static server exposing `base_path`
    ///   (e.g., "http://localhost:8080/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        Ok(self.base_path.join(bucket))
    }

    /// Convert bucket and key to a filesystem path inside the bucket directory.
    fn key_to_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let bucket_path = self.bucket_path(bucket)?;

        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(bucket_path.join(relative))
    }

    fn map_read_error(bucket: &str, key: &str, path: &Path, e: std::io::Error) -> StorageError {
        if e.kind() == ErrorKind::NotFound {
            StorageError::NotFound(format!("{}/{}", bucket, key))
        } else {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        }
    }

    async fn write_file(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(bytes_copied)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to create bucket directory {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let path = self.bucket_path(bucket)?;
        Ok(fs::try_exists(&path).await? && fs::metadata(&path).await?.is_dir())
    }

    async fn save(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<String> {
        let path = self.key_to_path(bucket, key)?;
        self.ensure_bucket(bucket).await?;

        let start = Instant::now();
        match self.write_file(&path, reader).await {
            Ok(size) => {
                tracing::info!(
                    path = %path.display(),
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage upload successful"
                );
                Ok(key.to_string())
            }
            Err(e) => {
                // Drop the partial file; the key was never handed out
                let _ = fs::remove_file(&path).await;
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "Local storage upload failed"
                );
                Err(e)
            }
        }
    }

    async fn read_all(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(bucket, key)?;
        let start = Instant::now();

        let data = fs::read(&path)
            .await
            .map_err(|e| Self::map_read_error(bucket, key, &path, e))?;

        tracing::info!(
            path = %path.display(),
            bucket = %bucket,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let path = self.key_to_path(bucket, key)?;

        let file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_read_error(bucket, key, &path, e))?;

        let key = key.to_string();
        let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE).map(move |result| {
            result.map_err(|e| {
                tracing::error!(error = %e, key = %key, "Local storage stream download error");
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.key_to_path(bucket, key)?;

        // Local files are served by an external static server; the expiry is advisory
        let expires_at = SystemTime::now()
            .checked_add(expires_in)
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .ok_or_else(|| StorageError::BackendError("Invalid expiry".to_string()))?;

        Ok(format!(
            "{}/{}/{}?expires={}",
            self.base_url.trim_end_matches('/'),
            bucket,
            key,
            expires_at
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
