//! File service
//!
//! Keeps the blob store and the metadata store consistent without a shared
//! transaction. Uploads write the blob first and the record second; deletes remove the
//! blob first and the record second. When the second step fails the stores disagree,
//! and that is reported as a critical event carrying enough context for offline repair.

use std::sync::Arc;

use filestash_core::models::FileRecord;
use filestash_core::{AppError, Config, UploadPolicy};
use filestash_db::FileRepository;
use filestash_storage::{Storage, StorageError};
use uuid::Uuid;

use super::types::{FileDownload, UploadRequest};

#[derive(Clone)]
pub struct FileService {
    repository: Arc<dyn FileRepository>,
    storage: Arc<dyn Storage>,
    policy: UploadPolicy,
    default_mime_type: String,
    cache_max_age_secs: u64,
}

impl FileService {
    pub fn new(
        repository: Arc<dyn FileRepository>,
        storage: Arc<dyn Storage>,
        config: &Config,
    ) -> Self {
        Self {
            repository,
            storage,
            policy: config.upload_policy(),
            default_mime_type: config.default_mime_type().to_string(),
            cache_max_age_secs: config.download_cache_max_age_secs(),
        }
    }

    fn effective_mime_type(&self, declared: Option<&str>) -> String {
        match declared.map(str::trim) {
            Some(content_type) if !content_type.is_empty() => content_type.to_string(),
            _ => self.default_mime_type.clone(),
        }
    }

    /// Validate and store a new file, returning its identifier.
    #[tracing::instrument(skip(self, request), fields(
        file.name = %request.original_filename,
        file.size_bytes = request.data.len()
    ))]
    pub async fn upload(&self, request: UploadRequest) -> Result<Uuid, AppError> {
        let mime_type = self.effective_mime_type(request.content_type.as_deref());
        let size = request.data.len();

        self.policy
            .validate_all(size, &mime_type, &request.original_filename)?;

        let id = Uuid::new_v4();
        let record = FileRecord::new(id, &request.original_filename, &mime_type, size);

        match self
            .storage
            .write_create_only(&record.stored_name, request.data)
            .await
        {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(key)) => {
                tracing::warn!(
                    file.id = %id,
                    stored_name = %key,
                    "Generated storage name already exists"
                );
                return Err(AppError::Conflict(key));
            }
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    error = %e,
                    file.id = %id,
                    file.name = %record.original_name,
                    file.mime_type = %record.mime_type,
                    file.extension = %record.file_extension,
                    file.size_bytes = size,
                    "Failed to write file to storage"
                );
                return Err(AppError::StorageUnavailable(e.to_string()));
            }
        }

        if let Err(e) = self.repository.insert(&record).await {
            tracing::error!(
                severity = "critical",
                error = %e,
                file.id = %id,
                file.name = %record.original_name,
                file.mime_type = %record.mime_type,
                file.extension = %record.file_extension,
                file.size_bytes = size,
                orphaned_blob = %record.stored_name,
                "Stored file has no metadata record; blob is orphaned"
            );
            return Err(AppError::StorageUnavailable(format!(
                "metadata insert failed after blob write: {}",
                e
            )));
        }

        tracing::info!(
            file.id = %id,
            file.mime_type = %record.mime_type,
            file.extension = %record.file_extension,
            "File uploaded"
        );

        Ok(id)
    }

    pub async fn list_all(&self) -> Result<Vec<FileRecord>, AppError> {
        self.repository.find_all().await.map_err(|e| {
            tracing::error!(severity = "critical", error = %e, "Failed to list file metadata");
            e
        })
    }

    /// Records for the given identifiers. Unknown identifiers are left out.
    pub async fn lookup_many(&self, ids: &[Uuid]) -> Result<Vec<FileRecord>, AppError> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        self.repository.find_by_ids(&unique).await.map_err(|e| {
            tracing::error!(
                severity = "critical",
                error = %e,
                ids = unique.len(),
                "Failed to look up file metadata"
            );
            e
        })
    }

    async fn find_record(&self, id: Uuid) -> Result<FileRecord, AppError> {
        match self.repository.find_by_id(id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(AppError::NotFound(format!("File {} not found", id))),
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    error = %e,
                    file.id = %id,
                    "Failed to read file metadata"
                );
                Err(e)
            }
        }
    }

    fn missing_blob(record: &FileRecord) -> AppError {
        tracing::error!(
            severity = "critical",
            file.id = %record.id,
            file.name = %record.original_name,
            file.mime_type = %record.mime_type,
            file.extension = %record.file_extension,
            file.size_bytes = record.size_bytes,
            stored_name = %record.stored_name,
            "Metadata record exists but its blob is missing"
        );
        AppError::Inconsistent(format!(
            "blob {} missing for file {}",
            record.stored_name, record.id
        ))
    }

    /// Open a stored file for streaming.
    #[tracing::instrument(skip(self), fields(file.id = %id))]
    pub async fn download(&self, id: Uuid) -> Result<FileDownload, AppError> {
        let record = self.find_record(id).await?;

        let exists = self
            .storage
            .exists(&record.stored_name)
            .await
            .map_err(|e| self.storage_failure(&record, e, "Failed to check file in storage"))?;
        if !exists {
            return Err(Self::missing_blob(&record));
        }

        let stream = match self.storage.open_read(&record.stored_name).await {
            Ok(stream) => stream,
            Err(StorageError::NotFound(_)) => return Err(Self::missing_blob(&record)),
            Err(e) => {
                return Err(self.storage_failure(&record, e, "Failed to open file in storage"))
            }
        };

        Ok(FileDownload {
            stream,
            content_type: self.effective_mime_type(Some(&record.mime_type)),
            stored_name: record.stored_name,
            size_bytes: record.size_bytes,
            cache_control: format!("public, max-age={}", self.cache_max_age_secs),
        })
    }

    /// Remove a file: blob first, then its record.
    #[tracing::instrument(skip(self), fields(file.id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let record = self.find_record(id).await?;

        match self.storage.delete(&record.stored_name).await {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(
                    file.id = %id,
                    stored_name = %record.stored_name,
                    "Blob already missing, removing metadata record"
                );
            }
            Err(e) => {
                return Err(self.storage_failure(&record, e, "Failed to delete file from storage"))
            }
        }

        match self.repository.delete_by_id(id).await {
            Ok(true) => {
                tracing::info!(file.id = %id, "File deleted");
                Ok(())
            }
            Ok(false) => Err(AppError::NotFound(format!("File {} not found", id))),
            Err(e) => {
                tracing::error!(
                    severity = "critical",
                    error = %e,
                    file.id = %id,
                    file.name = %record.original_name,
                    file.mime_type = %record.mime_type,
                    file.extension = %record.file_extension,
                    file.size_bytes = record.size_bytes,
                    stored_name = %record.stored_name,
                    "Blob deleted but metadata record remains"
                );
                Err(AppError::StorageUnavailable(format!(
                    "metadata delete failed after blob delete: {}",
                    e
                )))
            }
        }
    }

    fn storage_failure(&self, record: &FileRecord, err: StorageError, message: &str) -> AppError {
        tracing::error!(
            severity = "critical",
            error = %err,
            file.id = %record.id,
            file.name = %record.original_name,
            file.mime_type = %record.mime_type,
            file.extension = %record.file_extension,
            file.size_bytes = record.size_bytes,
            stored_name = %record.stored_name,
            "{}",
            message
        );
        AppError::StorageUnavailable(err.to_string())
    }

    /// Both stores answer; used by the health endpoint.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.repository.ping().await?;
        self.storage
            .ping()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    pub fn backend_names(&self) -> (String, &'static str) {
        (
            self.repository.backend().to_string(),
            self.storage.backend_name(),
        )
    }
}
