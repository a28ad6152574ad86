//! Health check handler and response type.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub metadata_backend: String,
    pub storage_backend: String,
    pub stores: String,
}

/// Health check: both the metadata store and the blob directory must answer.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (metadata_backend, storage_backend) = state.files.backend_names();

    let stores = match tokio::time::timeout(TIMEOUT, state.files.ping()).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Health check failed");
            "unhealthy".to_string()
        }
        Err(_) => {
            tracing::error!("Health check timed out");
            "timeout".to_string()
        }
    };

    let healthy = stores == "healthy";
    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        metadata_backend,
        storage_backend: storage_backend.to_string(),
        stores,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
