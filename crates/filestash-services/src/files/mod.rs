//! File upload, query, download and delete

mod service;
mod types;

pub use service::FileService;
pub use types::{FileDownload, UploadRequest};
