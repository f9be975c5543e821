//! File manager service
//!
//! Coordinates the object store and the metadata store. Uploads write the blob first and
//! the record second, so a failure can leave an unreferenced blob but never a record
//! pointing at nothing. Downloads always resolve the record before touching storage.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use filevault_core::models::{FileRecord, NewFileRecord};
use filevault_core::naming::{generate_short_name, is_valid_short_name, normalize_filename, storage_path};
use filevault_core::AppError;
use filevault_db::FileRecordStore;
use filevault_storage::{ObjectStream, Storage, StorageError};
use futures::{Stream, TryStreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An incoming file: client-supplied name and type plus a one-shot byte reader.
///
/// The reader may borrow from the request (multipart fields do), hence the lifetime.
pub struct UploadedFile<'a> {
    pub filename: String,
    pub content_type: Option<String>,
    content: Pin<Box<dyn AsyncRead + Send + 'a>>,
    bytes_read: Arc<AtomicU64>,
}

impl<'a> UploadedFile<'a> {
    /// Wrap a chunk stream, counting bytes as the storage backend consumes them.
    pub fn from_stream<S, E>(
        filename: impl Into<String>,
        content_type: Option<String>,
        stream: S,
    ) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'a,
        E: std::error::Error + Send + Sync + 'static,
    {
        let bytes_read = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&bytes_read);
        let counted = stream.map_err(io::Error::other).inspect_ok(move |chunk| {
            counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        });

        Self {
            filename: filename.into(),
            content_type: content_type.filter(|t| !t.trim().is_empty()),
            content: Box::pin(StreamReader::new(counted)),
            bytes_read,
        }
    }

    /// Bytes received so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }
}

impl UploadedFile<'static> {
    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let chunks = vec![Ok::<Bytes, io::Error>(data.into())];
        Self::from_stream(filename, content_type, futures::stream::iter(chunks))
    }
}

/// Missing blobs behind an existing record are a server-side inconsistency, not a 404.
fn read_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(key) => AppError::ObjectNotFound(key),
        other => AppError::StorageRead(other.to_string()),
    }
}

/// Upload and download coordinator shared by all requests.
#[derive(Clone)]
pub struct FileManager {
    storage: Arc<dyn Storage>,
    records: Arc<dyn FileRecordStore>,
    bucket: String,
    presigned_url_ttl: Duration,
}

impl FileManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        records: Arc<dyn FileRecordStore>,
        bucket: impl Into<String>,
        presigned_url_ttl: Duration,
    ) -> Self {
        Self {
            storage,
            records,
            bucket: bucket.into(),
            presigned_url_ttl,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store the blob under a fresh short name, then persist its record.
    #[tracing::instrument(skip(self, upload), fields(filename = %upload.filename, short_name))]
    pub async fn save(&self, mut upload: UploadedFile<'_>) -> Result<FileRecord, AppError> {
        let start = Instant::now();
        let short_name = generate_short_name();
        tracing::Span::current().record("short_name", short_name.as_str());

        let filename = normalize_filename(&upload.filename);
        let path = storage_path(&short_name, &filename);
        let content_type = upload
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        self.storage
            .save(&self.bucket, &path, &content_type, &mut upload.content)
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;

        let size = i64::try_from(upload.bytes_read())
            .map_err(|_| AppError::PayloadTooLarge("File size overflows".to_string()))?;

        let record = self
            .records
            .insert(NewFileRecord {
                short_name,
                path_in_storage: path,
                filename,
                size,
                file_type: upload.content_type.take(),
            })
            .await
            .inspect_err(|e| {
                // The blob stays behind without a record; nothing can address it
                tracing::warn!(error = %e, "Metadata insert failed after blob write");
            })?;

        tracing::info!(
            short_name = %record.short_name,
            key = %record.path_in_storage,
            size_bytes = record.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File stored"
        );

        Ok(record)
    }

    async fn find(&self, short_name: &str) -> Result<FileRecord, AppError> {
        if !is_valid_short_name(short_name) {
            return Err(AppError::NotFound("File was not found".to_string()));
        }
        self.records
            .find_by_short_name(short_name)
            .await?
            .ok_or_else(|| AppError::NotFound("File was not found".to_string()))
    }

    /// Full object bytes together with the record describing them.
    #[tracing::instrument(skip(self))]
    pub async fn download_full(&self, short_name: &str) -> Result<(FileRecord, Bytes), AppError> {
        let record = self.find(short_name).await?;
        let data = self
            .storage
            .read_all(&self.bucket, &record.path_in_storage)
            .await
            .map_err(read_error)?;
        Ok((record, data))
    }

    /// Lazily read object chunks; dropping the stream releases the storage connection.
    #[tracing::instrument(skip(self))]
    pub async fn download_stream(
        &self,
        short_name: &str,
    ) -> Result<(FileRecord, ObjectStream), AppError> {
        let record = self.find(short_name).await?;
        let stream = self
            .storage
            .open_stream(&self.bucket, &record.path_in_storage)
            .await
            .map_err(read_error)?;
        Ok((record, stream))
    }

    /// Time-limited direct URL. The object itself is not checked.
    #[tracing::instrument(skip(self))]
    pub async fn presigned_url(&self, short_name: &str) -> Result<String, AppError> {
        let record = self.find(short_name).await?;
        self.storage
            .presign(&self.bucket, &record.path_in_storage, self.presigned_url_ttl)
            .await
            .map_err(read_error)
    }
}
