use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata for one stored file. Rows are written once, after the blob is in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FileRecord {
    pub id: Uuid,
    pub short_name: String,
    /// Object key inside the bucket, always `{short_name}/{filename}`.
    pub path_in_storage: String,
    pub filename: String,
    pub size: i64,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Content type used when serving the file back.
    pub fn content_type(&self) -> &str {
        self.file_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("application/octet-stream")
    }
}

/// Values supplied by the file manager for a new row; `id` and `created_at` come from the store.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub short_name: String,
    pub path_in_storage: String,
    pub filename: String,
    pub size: i64,
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponse {
    pub id: Uuid,
    pub path_in_storage: String,
    pub filename: String,
    pub size: i64,
    pub file_type: Option<String>,
    pub short_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        FileResponse {
            id: record.id,
            path_in_storage: record.path_in_storage,
            filename: record.filename,
            size: record.size,
            file_type: record.file_type,
            short_name: record.short_name,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(file_type: Option<&str>) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            short_name: "7dHm9xQa2bKcP4rTvWz8Ne".to_string(),
            path_in_storage: "7dHm9xQa2bKcP4rTvWz8Ne/report.pdf".to_string(),
            filename: "report.pdf".to_string(),
            size: 1024,
            file_type: file_type.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_response_carries_every_public_field() {
        let record = sample_record(Some("application/pdf"));
        let id = record.id;
        let json = serde_json::to_value(FileResponse::from(record)).unwrap();

        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["short_name"], "7dHm9xQa2bKcP4rTvWz8Ne");
        assert_eq!(json["path_in_storage"], "7dHm9xQa2bKcP4rTvWz8Ne/report.pdf");
        assert_eq!(json["filename"], "report.pdf");
        assert_eq!(json["size"], 1024);
        assert_eq!(json["file_type"], "application/pdf");
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_content_type_falls_back_to_octet_stream() {
        assert_eq!(
            sample_record(Some("image/png")).content_type(),
            "image/png"
        );
        assert_eq!(
            sample_record(None).content_type(),
            "application/octet-stream"
        );
        assert_eq!(
            sample_record(Some("")).content_type(),
            "application/octet-stream"
        );
    }
}
