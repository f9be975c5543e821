//! Filevault Storage Library
//!
//! This crate is the object storage gateway: the `Storage` trait plus S3 (and
//! S3-compatible, e.g. MinIO) and local filesystem implementations.
//!
//! # Bucket and key format
//!
//! Every call names its bucket explicitly. Object keys have the form
//! `{short_name}/{filename}`; keys must not be empty, contain `..` or start with `/`.
//! Validation is centralized in the `keys` module so all backends agree.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use filevault_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectStream, Storage, StorageError, StorageResult, STREAM_CHUNK_SIZE};
