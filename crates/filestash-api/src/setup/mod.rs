//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use filestash_core::{Config, MetadataBackend};
use filestash_services::{create_file_repository, FileService};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_json())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        metadata_backend = %config.metadata_backend(),
        "Configuration loaded and validated successfully"
    );

    // Metadata store
    let pool = match config.metadata_backend() {
        MetadataBackend::Postgres => Some(database::setup_database(&config).await?),
        MetadataBackend::Memory => None,
    };
    let repository = create_file_repository(&config, pool)
        .map_err(|e| anyhow::anyhow!("Failed to create file repository: {}", e))?;

    // Blob store
    let storage = storage::setup_storage(&config).await?;

    let files = FileService::new(repository, storage, &config);
    let state = Arc::new(AppState::new(files));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
