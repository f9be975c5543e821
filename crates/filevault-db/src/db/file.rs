//! File metadata repository: insert and lookup for the files table.

use async_trait::async_trait;
use filevault_core::models::{FileRecord, NewFileRecord};
use filevault_core::AppError;
use sqlx::{PgPool, Postgres};

/// Metadata store used by the file manager.
///
/// Records are insert-only; there is no update or delete path.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Insert a record and return it with its generated id and timestamp.
    ///
    /// A duplicate short name fails without leaving a row behind.
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError>;

    /// Look up a record by its public short name.
    async fn find_by_short_name(&self, short_name: &str) -> Result<Option<FileRecord>, AppError>;

    /// Round-trip to the backing store, used by readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Postgres-backed repository for the files table.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FileRecordStore for FileRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "files", short_name = %record.short_name))]
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        // On error the transaction is dropped, which rolls it back
        let row = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            INSERT INTO files (short_name, path_in_storage, filename, size, file_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, short_name, path_in_storage, filename, size, file_type, created_at
            "#,
        )
        .bind(&record.short_name)
        .bind(&record.path_in_storage)
        .bind(&record.filename)
        .bind(record.size)
        .bind(&record.file_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(file_id = %row.id, "File record inserted");
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files"))]
    async fn find_by_short_name(&self, short_name: &str) -> Result<Option<FileRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            SELECT id, short_name, path_in_storage, filename, size, file_type, created_at
            FROM files
            WHERE short_name = $1
            "#,
        )
        .bind(short_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
