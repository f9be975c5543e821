//! OpenAPI documentation, served at `/api/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use filevault_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filevault API",
        version = "0.1.0",
        description = "File storage proxy: uploads go to S3-compatible object storage with metadata in Postgres; files are served back in full, as a stream, or through a presigned URL. All file endpoints are versioned under /api/v1/."
    ),
    paths(
        handlers::root::root,
        handlers::files::upload_file,
        handlers::files::download_full,
        handlers::files::download_stream,
        handlers::files::get_url,
    ),
    components(schemas(
        models::FileResponse,
        error::ErrorResponse,
        handlers::root::RootResponse,
    )),
    tags(
        (name = "files", description = "Upload and download"),
        (name = "root", description = "Service root")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_file_endpoints() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/",
            "/api/v1/download-full/{short_name}",
            "/api/v1/download-stream/{short_name}",
            "/api/v1/get-url/{short_name}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
