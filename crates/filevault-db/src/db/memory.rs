//! In-memory metadata store for tests and database-less runs.

use async_trait::async_trait;
use chrono::Utc;
use filevault_core::models::{FileRecord, NewFileRecord};
use filevault_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::file::FileRecordStore;

/// Records keyed by short name, shared between clones.
#[derive(Clone, Default)]
pub struct InMemoryFileRepository {
    records: Arc<Mutex<HashMap<String, FileRecord>>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<String, FileRecord>>, AppError> {
        self.records
            .lock()
            .map_err(|_| AppError::Internal("file record store lock poisoned".to_string()))
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileRecordStore for InMemoryFileRepository {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let mut records = self.records()?;
        if records.contains_key(&record.short_name) {
            return Err(AppError::Internal(format!(
                "duplicate short name: {}",
                record.short_name
            )));
        }

        let stored = FileRecord {
            id: Uuid::new_v4(),
            short_name: record.short_name,
            path_in_storage: record.path_in_storage,
            filename: record.filename,
            size: record.size,
            file_type: record.file_type,
            created_at: Utc::now(),
        };
        records.insert(stored.short_name.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_short_name(&self, short_name: &str) -> Result<Option<FileRecord>, AppError> {
        Ok(self.records()?.get(short_name).cloned())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.records().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(short_name: &str) -> NewFileRecord {
        NewFileRecord {
            short_name: short_name.to_string(),
            path_in_storage: format!("{}/notes.txt", short_name),
            filename: "notes.txt".to_string(),
            size: 5,
            file_type: Some("text/plain".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let repo = InMemoryFileRepository::new();
        let stored = repo.insert(new_record("abc")).await.unwrap();

        let found = repo.find_by_short_name("abc").await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.path_in_storage, "abc/notes.txt");
        assert!(repo.find_by_short_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_short_name_is_rejected() {
        let repo = InMemoryFileRepository::new();
        let first = repo.insert(new_record("abc")).await.unwrap();

        assert!(repo.insert(new_record("abc")).await.is_err());
        assert_eq!(repo.len(), 1);
        let found = repo.find_by_short_name("abc").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }
}
