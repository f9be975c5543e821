//! Route configuration and setup.
//!
//! File endpoints live under `/api/v1`; health checks in [health](health).

mod health;

use crate::api_doc::ApiDoc;
use crate::constants::api_prefix;
use crate::handlers::{files, root};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use filevault_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Build the full application router around shared state.
pub fn setup_routes(state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let config = &state.config;
    let cors = setup_cors(config)?;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
        .max(1);
    tracing::info!(
        http_concurrency_limit,
        max_upload_size_bytes = config.max_upload_size_bytes(),
        "HTTP limits configured"
    );

    let app = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::liveness_check))
        .route("/health/ready", get(health::readiness_check))
        .merge(file_routes())
        .merge(RapiDoc::with_openapi("/api/openapi.json", ApiDoc::openapi()).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        // Multipart reads honor DefaultBodyLimit (2 MB), so the explicit limit replaces it
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes()))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn file_routes() -> Router<Arc<AppState>> {
    let prefix = api_prefix();
    Router::new()
        .route(&format!("{}/", prefix), post(files::upload_file))
        .route(&prefix, post(files::upload_file))
        .route(
            &format!("{}/download-full/{{short_name}}", prefix),
            get(files::download_full),
        )
        .route(
            &format!("{}/download-stream/{{short_name}}", prefix),
            get(files::download_stream),
        )
        .route(
            &format!("{}/get-url/{{short_name}}", prefix),
            get(files::get_url),
        )
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {}: {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
