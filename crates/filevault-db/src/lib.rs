//! Filevault metadata store
//!
//! Persists one `FileRecord` per uploaded file in Postgres, keyed by id with a
//! unique short name. An in-memory implementation of the same trait backs tests.

pub mod db;

pub use db::file::{FileRecordStore, FileRepository};
pub use db::memory::InMemoryFileRepository;
pub use db::migrations::run_migrations;
