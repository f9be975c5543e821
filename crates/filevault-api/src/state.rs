//! Application state shared by all handlers.

use crate::services::file_manager::FileManager;
use filevault_core::Config;
use filevault_db::FileRecordStore;
use filevault_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Handlers extract `State<Arc<AppState>>`; everything inside is cheap to share.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub file_manager: FileManager,
    /// Same backend the file manager writes to, kept for health checks.
    pub storage: Arc<dyn Storage>,
    pub records: Arc<dyn FileRecordStore>,
    /// Absent when records live in memory.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        records: Arc<dyn FileRecordStore>,
    ) -> Self {
        let file_manager = FileManager::new(
            storage.clone(),
            records.clone(),
            config.bucket_name(),
            Duration::from_secs(config.presigned_url_ttl_secs()),
        );
        Self {
            config,
            file_manager,
            storage,
            records,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}
