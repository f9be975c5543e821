//! Filevault API Library
//!
//! This crate provides the file manager service, HTTP handlers and application setup.

// Module declarations
mod api_doc;
mod handlers;
mod utils;

// Public modules
pub mod constants;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::file_manager::{FileManager, UploadedFile};
pub use state::AppState;
