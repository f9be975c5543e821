//! File upload and download integration tests.
//!
//! Run with: `cargo test -p filevault-api --test files_test`

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use filevault_core::models::FileResponse;
use helpers::{api_path, file_form, setup_test_app, setup_test_app_with_limit};
use std::collections::HashSet;

async fn upload(app: &helpers::TestApp, filename: &str, mime: &str, data: &[u8]) -> FileResponse {
    let response = app
        .client()
        .post(&api_path("/"))
        .multipart(file_form(filename, mime, data))
        .await;
    response.assert_status_ok();
    response.json::<FileResponse>()
}

#[tokio::test]
async fn test_root_greets() {
    let app = setup_test_app().await;
    let response = app.client().get("/").await;

    response.assert_status_ok();
    response.assert_json(&serde_json::json!({ "message": "Hello World" }));
}

#[tokio::test]
async fn test_upload_returns_record() {
    let app = setup_test_app().await;
    let record = upload(&app, "report.pdf", "application/pdf", b"%PDF-1.7 body").await;

    assert_eq!(record.short_name.len(), 22);
    assert_eq!(record.filename, "report.pdf");
    assert_eq!(
        record.path_in_storage,
        format!("{}/report.pdf", record.short_name)
    );
    assert_eq!(record.size, 13);
    assert_eq!(record.file_type.as_deref(), Some("application/pdf"));
    assert!(app.blob_path(&record.path_in_storage).exists());
    assert_eq!(app.records.len(), 1);
}

#[tokio::test]
async fn test_upload_normalizes_cyrillic_filename() {
    let app = setup_test_app().await;
    let record = upload(&app, "Мой файл (1).docx", "application/msword", b"doc").await;

    assert_eq!(record.filename, "Moj_fajl_1.docx");
    assert!(record.path_in_storage.ends_with("/Moj_fajl_1.docx"));
}

#[tokio::test]
async fn test_upload_without_trailing_slash() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/api/v1")
        .multipart(file_form("a.txt", "text/plain", b"abc"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_full_download_round_trip() {
    let app = setup_test_app().await;
    let content: Vec<u8> = (0..150_000u32).map(|i| (i % 241) as u8).collect();
    let record = upload(&app, "data.bin", "application/octet-stream", &content).await;

    let response = app
        .client()
        .get(&api_path(&format!("/download-full/{}", record.short_name)))
        .await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), content.as_slice());
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/octet-stream"
    );
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename=\"data.bin\""));
}

#[tokio::test]
async fn test_stream_download_round_trip() {
    let app = setup_test_app().await;
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 199) as u8).collect();
    let record = upload(&app, "video.mp4", "video/mp4", &content).await;

    let response = app
        .client()
        .get(&api_path(&format!("/download-stream/{}", record.short_name)))
        .await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), content.as_slice());
    assert_eq!(response.header("content-type").to_str().unwrap(), "video/mp4");
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("filename*=UTF-8''video.mp4"));
}

#[tokio::test]
async fn test_get_url_returns_json_string() {
    let app = setup_test_app().await;
    let record = upload(&app, "photo.jpg", "image/jpeg", b"jpeg bytes").await;

    let response = app
        .client()
        .get(&api_path(&format!("/get-url/{}", record.short_name)))
        .await;

    response.assert_status_ok();
    let url = response.json::<String>();
    assert!(url.starts_with(&format!(
        "{}/{}/{}",
        helpers::LOCAL_BASE_URL,
        helpers::BUCKET,
        record.path_in_storage
    )));
}

#[tokio::test]
async fn test_unknown_short_name_is_404_on_every_download() {
    let app = setup_test_app().await;
    let unknown = "ZZZZZZZZZZZZZZZZZZZZZZ";

    for endpoint in ["download-full", "download-stream", "get-url"] {
        let response = app
            .client()
            .get(&api_path(&format!("/{}/{}", endpoint, unknown)))
            .expect_failure()
            .await;

        response.assert_status_not_found();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_missing_file_field_is_400() {
    let app = setup_test_app().await;
    let form = MultipartForm::new().add_text("note", "no file here");

    let response = app
        .client()
        .post(&api_path("/"))
        .multipart(form)
        .expect_failure()
        .await;

    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["code"], "INVALID_INPUT");
    assert!(app.records.is_empty());
}

#[tokio::test]
async fn test_file_field_without_filename_is_400() {
    let app = setup_test_app().await;
    let form = MultipartForm::new().add_part("file", Part::bytes(b"abc".to_vec()));

    let response = app
        .client()
        .post(&api_path("/"))
        .multipart(form)
        .expect_failure()
        .await;

    response.assert_status_bad_request();
    assert!(app.records.is_empty());
}

#[tokio::test]
async fn test_second_file_field_is_400() {
    let app = setup_test_app().await;
    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(b"one".to_vec()).file_name("one.txt"),
        )
        .add_part(
            "file",
            Part::bytes(b"two".to_vec()).file_name("two.txt"),
        );

    let response = app
        .client()
        .post(&api_path("/"))
        .multipart(form)
        .expect_failure()
        .await;

    response.assert_status_bad_request();
    assert_eq!(app.records.len(), 1);

    // The stored first file is named in the error and still downloadable
    let body = response.json::<serde_json::Value>();
    let message = body["error"].as_str().unwrap();
    let short_name = message.rsplit(' ').next().unwrap();
    assert_eq!(short_name.len(), 22);

    let download = app
        .client()
        .get(&api_path(&format!("/download-full/{}", short_name)))
        .await;
    download.assert_status_ok();
    assert_eq!(download.as_bytes().as_ref(), b"one");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = setup_test_app_with_limit(1024).await;

    let response = app
        .client()
        .post(&api_path("/"))
        .multipart(file_form("big.bin", "application/octet-stream", &[7u8; 4096]))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), 413);
    assert!(app.records.is_empty());
}

#[tokio::test]
async fn test_same_filename_gets_distinct_short_names() {
    let app = setup_test_app().await;

    let mut names = HashSet::new();
    let mut paths = HashSet::new();
    for _ in 0..10 {
        let record = upload(&app, "same.txt", "text/plain", b"same").await;
        names.insert(record.short_name);
        paths.insert(record.path_in_storage);
    }

    assert_eq!(names.len(), 10);
    assert_eq!(paths.len(), 10);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = setup_test_app().await;

    let live = app.client().get("/health").await;
    live.assert_status_ok();
    live.assert_json(&serde_json::json!({ "status": "alive" }));

    let ready = app.client().get("/health/ready").await;
    ready.assert_status_ok();
    let body = ready.json::<serde_json::Value>();
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app().await;
    let response = app.client().get("/api/openapi.json").await;

    response.assert_status_ok();
    let doc = response.json::<serde_json::Value>();
    assert!(doc["paths"]["/api/v1/get-url/{short_name}"].is_object());
}
