use crate::keys::{validate_bucket, validate_key};
use crate::traits::{ObjectStream, Storage, StorageError, StorageResult, STREAM_CHUNK_SIZE};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

/// Size of each multipart upload part. Content that fits in one part is sent with a
/// single PutObject instead.
const PART_SIZE: usize = 10 * 1024 * 1024;

const DEFAULT_REGION: &str = "us-east-1";

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    region: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or any region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `credentials` - Optional static access key and secret; the default AWS
    ///   credential chain is used when absent
    pub async fn new(
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<(String, String)>,
    ) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(RetryConfig::disabled());
        if let Some((access_key, secret_key)) = credentials {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        let config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
        if let Some(ref endpoint) = endpoint_url {
            // Path-style addressing is required by MinIO and most S3-compatible providers
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }
        let client = Client::from_conf(s3_config_builder.build());

        tracing::debug!(
            region = %region,
            endpoint = ?endpoint_url,
            "S3 client configured"
        );

        Ok(S3Storage { client, region })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        S3Storage {
            client,
            region: region.into(),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<GetObjectOutput> {
        let start = Instant::now();
        self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(GetObjectError::NoSuchKey(_)) => {
                    StorageError::NotFound(format!("{}/{}", bucket, key))
                }
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 get object failed"
                    );
                    StorageError::DownloadFailed(e.to_string())
                }
            })
    }

    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(())
    }

    /// Multipart upload starting from an already read first part. Aborts the upload on
    /// any failure so no incomplete parts are left behind.
    async fn put_multipart<R>(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        first_part: Bytes,
        reader: &mut R,
    ) -> StorageResult<(u64, i32)>
    where
        R: AsyncRead + Send + Unpin + ?Sized,
    {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::UploadFailed("No upload ID returned from S3".to_string()))?
            .to_string();

        match self
            .upload_parts(bucket, key, &upload_id, first_part, reader)
            .await
        {
            Ok(uploaded) => Ok(uploaded),
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %abort_err,
                        bucket = %bucket,
                        key = %key,
                        upload_id = %upload_id,
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts<R>(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        first_part: Bytes,
        reader: &mut R,
    ) -> StorageResult<(u64, i32)>
    where
        R: AsyncRead + Send + Unpin + ?Sized,
    {
        let mut parts = Vec::new();
        let mut part_number = 1i32;
        let mut total_size = 0u64;
        let mut part = first_part;

        loop {
            total_size += part.len() as u64;

            let uploaded = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(part))
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        key = %key,
                        part_number = part_number,
                        "Failed to upload part"
                    );
                    StorageError::UploadFailed(e.to_string())
                })?;

            let etag = uploaded
                .e_tag()
                .ok_or_else(|| {
                    StorageError::UploadFailed(format!("No ETag returned for part {}", part_number))
                })?
                .to_string();

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );

            part = read_part(reader, PART_SIZE).await?;
            if part.is_empty() {
                break;
            }
            part_number += 1;
        }

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        Ok((total_size, part_number))
    }
}

/// Read up to `limit` bytes, stopping early only at EOF.
async fn read_part<R>(reader: &mut R, limit: usize) -> StorageResult<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = Vec::with_capacity(limit);
    (&mut *reader)
        .take(limit as u64)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| StorageError::UploadFailed(format!("Failed to read from stream: {}", e)))?;
    Ok(Bytes::from(buffer))
}

/// AWS rejects an explicit `us-east-1` location constraint.
fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    if region.is_empty() || region == DEFAULT_REGION {
        None
    } else {
        Some(BucketLocationConstraint::from(region))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.bucket_exists(bucket).await? {
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(bucket);
        if let Some(constraint) = location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %bucket, "S3 bucket created");
                Ok(())
            }
            // Another request created it between the check and the create
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(CreateBucketError::BucketAlreadyOwnedByYou(_))
                ) =>
            {
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, bucket = %bucket, "S3 create bucket failed");
                Err(StorageError::BackendError(e.to_string()))
            }
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        validate_bucket(bucket)?;
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), HeadBucketError::NotFound(_)) =>
                {
                    Ok(false)
                }
                _ => Err(StorageError::BackendError(e.to_string())),
            },
        }
    }

    async fn save(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<String> {
        validate_key(key)?;
        self.ensure_bucket(bucket).await?;

        let start = Instant::now();
        let first_part = read_part(reader, PART_SIZE).await?;

        let result = if first_part.len() < PART_SIZE {
            let size = first_part.len() as u64;
            self.put_single(bucket, key, content_type, first_part)
                .await
                .map(|_| (size, 1))
        } else {
            self.put_multipart(bucket, key, content_type, first_part, reader)
                .await
        };

        match result {
            Ok((size, parts)) => {
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    parts = parts,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(key.to_string())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                Err(e)
            }
        }
    }

    async fn read_all(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        let start = Instant::now();
        let response = self.get_object(bucket, key).await?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = data.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data)
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        validate_key(key)?;
        let start = Instant::now();
        let response = self.get_object(bucket, key).await?;

        // The HTTP body is owned by the reader; dropping the stream closes the connection
        let async_read = response.body.into_async_read();
        let stream = ReaderStream::with_capacity(async_read, STREAM_CHUNK_SIZE)
            .map(|result| result.map_err(|e| StorageError::DownloadFailed(e.to_string())));

        let bucket = bucket.to_string();
        let key = key.to_string();
        let logged_stream = stream.map(move |item| {
            if let Err(ref e) = item {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
            }
            item
        });

        Ok(Box::pin(logged_stream))
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(key)?;
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(presigned_request.uri().to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::Region;

    fn offline_client() -> Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(DEFAULT_REGION))
            .credentials_provider(Credentials::new(
                "minioadmin",
                "minioadmin",
                None,
                None,
                "static",
            ))
            .endpoint_url("http://localhost:9000")
            .force_path_style(true)
            .build();
        Client::from_conf(config)
    }

    #[tokio::test]
    async fn test_presign_builds_signed_path_style_url() {
        let storage = S3Storage::from_client(offline_client(), DEFAULT_REGION);

        let url = storage
            .presign(
                "files",
                "7dHm9xQa2bKcP4rTvWz8Ne/report.pdf",
                Duration::from_secs(86400),
            )
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/files/7dHm9xQa2bKcP4rTvWz8Ne/report.pdf"));
        assert!(url.contains("X-Amz-Expires=86400"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_presign_rejects_invalid_key() {
        let storage = S3Storage::from_client(offline_client(), DEFAULT_REGION);
        let result = storage
            .presign("files", "../secret", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_read_part_stops_at_limit_and_eof() {
        let data = vec![7u8; 100];
        let mut reader: &[u8] = &data;

        let first = read_part(&mut reader, 64).await.unwrap();
        let second = read_part(&mut reader, 64).await.unwrap();
        let third = read_part(&mut reader, 64).await.unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(second.len(), 36);
        assert!(third.is_empty());
    }

    #[test]
    fn test_location_constraint() {
        assert!(location_constraint("us-east-1").is_none());
        assert_eq!(
            location_constraint("eu-west-1"),
            Some(BucketLocationConstraint::EuWest1)
        );
    }

    #[test]
    fn test_backend_type() {
        let storage = S3Storage::from_client(offline_client(), DEFAULT_REGION);
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }
}
