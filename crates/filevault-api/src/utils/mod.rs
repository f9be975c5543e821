//! Helpers shared by the HTTP handlers.

pub mod headers;
