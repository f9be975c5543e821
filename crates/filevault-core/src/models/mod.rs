//! Data models for the application
//!
//! The service persists a single entity: the metadata record of a stored file.

mod file;

pub use file::{FileRecord, FileResponse, NewFileRecord};
