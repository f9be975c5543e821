use crate::error::{ErrorResponse, HttpAppError};
use crate::services::file_manager::UploadedFile;
use crate::state::AppState;
use crate::utils::headers::{content_disposition, content_type, Disposition};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use filevault_core::models::{FileRecord, FileResponse};
use filevault_core::AppError;
use futures::TryStreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

fn build_response(
    record: &FileRecord,
    disposition: Disposition,
    content_length: Option<usize>,
    body: Body,
) -> Result<Response, HttpAppError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(record.content_type()))
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, &record.filename),
        );
    if let Some(len) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder.body(body).map_err(|e| {
        tracing::error!(error = %e, "Failed to build response");
        AppError::Internal(e.to_string()).into()
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Single `file` field"),
    responses(
        (status = 200, description = "File stored", body = FileResponse),
        (status = 400, description = "Missing or duplicate file field", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage or database failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, HttpAppError> {
    let mut stored: Option<FileRecord> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            tracing::debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }
        if let Some(first) = &stored {
            // The first file is already stored and recorded; name it so it stays reachable
            tracing::warn!(
                short_name = %first.short_name,
                key = %first.path_in_storage,
                "Rejecting extra file field after first file was stored"
            );
            return Err(AppError::InvalidInput(format!(
                "Only one file may be uploaded per request; the first file was stored as {}",
                first.short_name
            ))
            .into());
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::InvalidInput("Uploaded file has no filename".to_string()))?;
        let file_type = field.content_type().map(str::to_string);

        // A body limit hit mid-field surfaces from storage as a write error; keep it a 413
        let limit_hit = Arc::new(AtomicBool::new(false));
        let flag = limit_hit.clone();
        let body = field.inspect_err(move |e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                flag.store(true, Ordering::Relaxed);
            }
        });

        let upload = UploadedFile::from_stream(filename, file_type, body);
        stored = match state.file_manager.save(upload).await {
            Ok(record) => Some(record),
            Err(AppError::StorageWrite(_)) if limit_hit.load(Ordering::Relaxed) => {
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the {} byte upload limit",
                    state.config.max_upload_size_bytes()
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        };
    }

    let record = stored.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/download-full/{short_name}",
    tag = "files",
    params(("short_name" = String, Path, description = "Public short name of the file")),
    responses(
        (status = 200, description = "Whole file", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn download_full(
    State(state): State<Arc<AppState>>,
    Path(short_name): Path<String>,
) -> Result<Response, HttpAppError> {
    let (record, data) = state.file_manager.download_full(&short_name).await?;
    let len = data.len();
    build_response(&record, Disposition::Attachment, Some(len), Body::from(data))
}

#[utoipa::path(
    get,
    path = "/api/v1/download-stream/{short_name}",
    tag = "files",
    params(("short_name" = String, Path, description = "Public short name of the file")),
    responses(
        (status = 200, description = "Chunked file body", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn download_stream(
    State(state): State<Arc<AppState>>,
    Path(short_name): Path<String>,
) -> Result<Response, HttpAppError> {
    let (record, stream) = state.file_manager.download_stream(&short_name).await?;
    // Hyper polls the body only as fast as the client reads; a disconnect drops the stream
    build_response(&record, Disposition::Inline, None, Body::from_stream(stream))
}

#[utoipa::path(
    get,
    path = "/api/v1/get-url/{short_name}",
    tag = "files",
    params(("short_name" = String, Path, description = "Public short name of the file")),
    responses(
        (status = 200, description = "Presigned direct URL", body = String),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_url(
    State(state): State<Arc<AppState>>,
    Path(short_name): Path<String>,
) -> Result<Json<String>, HttpAppError> {
    let url = state.file_manager.presigned_url(&short_name).await?;
    Ok(Json(url))
}
