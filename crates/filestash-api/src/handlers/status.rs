use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/status",
    tag = "status",
    responses(
        (status = 200, description = "API is up", body = StatusResponse)
    )
)]
pub async fn api_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "API is operational!".to_string(),
    })
}
