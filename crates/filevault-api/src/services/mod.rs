//! Business services behind the HTTP handlers.

pub mod file_manager;
