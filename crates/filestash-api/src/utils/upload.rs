//! Multipart upload extraction

use axum::extract::Multipart;
use filestash_core::AppError;
use filestash_services::UploadRequest;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Read the single `file` field of a multipart form. Other fields are ignored.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<UploadRequest, AppError> {
    let mut upload: Option<UploadRequest> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        if upload.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let original_filename = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field.content_type().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        upload = Some(UploadRequest {
            data,
            content_type,
            original_filename,
        });
    }

    upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}
