//! HTTP handlers. Each one translates a request into a file manager call and back.

pub mod files;
pub mod root;
