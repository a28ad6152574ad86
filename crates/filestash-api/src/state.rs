//! Application state shared by every handler.

use filestash_services::FileService;

#[derive(Clone)]
pub struct AppState {
    pub files: FileService,
}

impl AppState {
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}
