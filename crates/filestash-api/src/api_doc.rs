//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use filestash_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filestash API",
        version = "0.1.0",
        description = "Upload files, list and look up their metadata, download and delete them. Files are referenced by the UUID token returned at upload."
    ),
    paths(
        // Status
        handlers::status::api_status,
        // Files
        handlers::files::upload_file,
        handlers::files::list_files,
        handlers::files::lookup_files,
        handlers::files::download_file,
        handlers::files::delete_file,
    ),
    components(
        schemas(
            models::FileRecord,
            models::UploadResponse,
            models::FileTokensRequest,
            handlers::files::DeleteResponse,
            handlers::status::StatusResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "File storage"),
        (name = "status", description = "Service status")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_file_routes() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/files"));
        assert!(spec.paths.paths.contains_key("/api/files/metas"));
        assert!(spec.paths.paths.contains_key("/api/files/{id}"));
        assert!(spec.paths.paths.contains_key("/api/status"));
    }
}
