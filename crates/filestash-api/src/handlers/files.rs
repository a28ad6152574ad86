use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;
use axum::{
    body::Body,
    extract::multipart::MultipartRejection,
    extract::rejection::PathRejection,
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use filestash_core::models::{FileRecord, FileTokensRequest, UploadResponse};
use filestash_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Form with a single `file` field"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Empty file, disallowed type, too large or bad form", body = ErrorResponse),
        (status = 503, description = "Storage unavailable or name collision", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = extract_multipart_file(multipart?).await?;
    let id = state.files.upload(request).await?;

    Ok(Json(UploadResponse { id }))
}

#[utoipa::path(
    get,
    path = "/api/files/metas",
    tag = "files",
    responses(
        (status = 200, description = "All file records", body = Vec<FileRecord>),
        (status = 503, description = "Metadata store unavailable", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = state.files.list_all().await?;
    Ok(Json(records))
}

#[utoipa::path(
    post,
    path = "/api/files/metas",
    tag = "files",
    request_body = FileTokensRequest,
    responses(
        (status = 200, description = "Records for the known tokens; unknown tokens are omitted", body = Vec<FileRecord>),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 503, description = "Metadata store unavailable", body = ErrorResponse)
    )
)]
pub async fn lookup_files(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<FileTokensRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let records = state.files.lookup_many(&body.ids).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File token")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed token", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 503, description = "Storage unavailable or file contents missing", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, id), fields(operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Path(id) = id?;
    let download = state.files.download(id).await?;

    tracing::debug!(
        file_id = %id,
        stored_name = %download.stored_name,
        size_bytes = download.size_bytes,
        "Streaming file from storage"
    );

    let content_disposition = HeaderValue::from_str(&download.content_disposition())
        .unwrap_or_else(|e| {
            tracing::warn!(
                file_id = %id,
                stored_name = %download.stored_name,
                error = %e,
                "Stored name is not a valid header value, sending bare attachment disposition"
            );
            HeaderValue::from_static("attachment")
        });
    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CACHE_CONTROL, download.cache_control.as_str())
        .body(Body::from_stream(download.stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File token")
    ),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 400, description = "Malformed token", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, id), fields(operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Path(id) = id?;
    state.files.delete(id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
