//! Filestash Services Layer
//!
//! Business orchestration over the metadata repository and the blob store. The HTTP
//! crate stays thin: it decodes requests, calls [`FileService`] and renders results.

pub mod files;

pub use files::{FileDownload, FileService, UploadRequest};
pub use filestash_db::{create_file_repository, FileRepository, InMemoryFileRepository};
pub use filestash_storage::{ByteStream, LocalStorage, Storage, StorageError, StorageResult};
