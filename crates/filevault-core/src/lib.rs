//! Filevault Core Library
//!
//! This crate provides the domain model, error types, configuration and filename
//! handling shared by every Filevault component.

pub mod config;
pub mod error;
pub mod models;
pub mod naming;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, FileServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError, StorageResult live in the filevault-storage crate
