//! Storage setup and initialization

use anyhow::{Context, Result};
use filevault_core::Config;
use filevault_storage::{create_storage, Storage};
use std::sync::Arc;

/// Build the configured backend and make sure the bucket exists before serving.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config).await?;

    storage
        .ensure_bucket(config.bucket_name())
        .await
        .with_context(|| format!("Failed to prepare bucket {}", config.bucket_name()))?;

    tracing::info!(
        backend = %storage.backend_type(),
        bucket = %config.bucket_name(),
        "Storage initialized successfully"
    );

    Ok(storage)
}
