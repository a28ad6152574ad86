pub mod file;

pub use file::{file_extension, stored_name_for, FileRecord, FileTokensRequest, UploadResponse};
