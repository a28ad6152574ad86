//! Blob storage setup

use anyhow::{Context, Result};
use filestash_core::Config;
use filestash_storage::{LocalStorage, Storage};
use std::sync::Arc;

/// Create the storage directory if needed and return the blob store.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.file_directory())
        .await
        .context("Failed to initialize local file storage")?;

    tracing::info!(
        directory = %storage.base_path().display(),
        "Local file storage ready"
    );

    Ok(Arc::new(storage))
}
