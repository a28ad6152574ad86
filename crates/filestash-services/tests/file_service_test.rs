use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use filestash_core::models::FileRecord;
use filestash_core::{AppError, Config, MetadataBackend};
use filestash_services::{
    ByteStream, FileRepository, FileService, InMemoryFileRepository, LocalStorage, Storage,
    StorageError, StorageResult, UploadRequest,
};
use futures::StreamExt;
use tempfile::TempDir;
use uuid::Uuid;

fn config(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

fn request(data: &'static [u8], name: &str, content_type: &str) -> UploadRequest {
    UploadRequest {
        data: Bytes::from_static(data),
        content_type: Some(content_type.to_string()),
        original_filename: name.to_string(),
    }
}

struct Harness {
    service: FileService,
    repository: Arc<InMemoryFileRepository>,
    storage: Arc<LocalStorage>,
    _dir: TempDir,
}

async fn harness(pairs: &[(&str, &str)]) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let repository = Arc::new(InMemoryFileRepository::new());
    let storage = Arc::new(LocalStorage::new(dir.path()).await.expect("storage"));
    let service = FileService::new(repository.clone(), storage.clone(), &config(pairs));
    Harness {
        service,
        repository,
        storage,
        _dir: dir,
    }
}

async fn collect(stream: ByteStream) -> Vec<u8> {
    let chunks: Vec<_> = stream.collect().await;
    chunks
        .into_iter()
        .flat_map(|chunk| chunk.expect("chunk").to_vec())
        .collect()
}

#[tokio::test]
async fn test_round_trip() {
    let h = harness(&[]).await;
    let id = h
        .service
        .upload(request(b"jpeg bytes", "a.jpg", "image/jpeg"))
        .await
        .unwrap();

    let download = h.service.download(id).await.unwrap();
    assert_eq!(download.content_type, "image/jpeg");
    assert_eq!(download.stored_name, format!("{}_a.jpg", id));
    assert_eq!(download.size_bytes, 10);
    assert_eq!(download.cache_control, "public, max-age=3600");
    assert_eq!(collect(download.stream).await, b"jpeg bytes");
}

#[tokio::test]
async fn test_empty_upload_creates_nothing() {
    let h = harness(&[]).await;
    let err = h
        .service
        .upload(request(b"", "a.jpg", "image/jpeg"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(ref msg) if msg == "Uploaded file is empty"));
    assert!(h.service.list_all().await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(h.storage.base_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_oversized_upload_mentions_limit() {
    let h = harness(&[("MAX_FILE_SIZE_BYTES", "5242880")]).await;
    let big = vec![7u8; 12 * 1024 * 1024];
    let err = h
        .service
        .upload(UploadRequest {
            data: Bytes::from(big),
            content_type: Some("image/jpeg".to_string()),
            original_filename: "largeFile.jpg".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        AppError::InvalidInput(msg) => assert!(msg.contains("5242880")),
        other => panic!("Expected InvalidInput, got {:?}", other),
    }
    assert!(h.service.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_include_list() {
    let h = harness(&[("LIMITED_FILE_TYPES", "image/jpeg")]).await;

    let err = h
        .service
        .upload(request(b"hello", "a.txt", "text/plain"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(ref msg) if msg == "Invalid file type"));

    assert!(h
        .service
        .upload(request(b"jpeg", "a.jpg", "image/jpeg"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_long_filename_is_invalid_input() {
    let h = harness(&[]).await;
    let name = format!("{}.jpg", "a".repeat(240));

    let err = h
        .service
        .upload(request(b"jpeg", &name, "image/jpeg"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AppError::InvalidInput(ref msg) if msg.starts_with("Invalid filename")),
        "got {:?}",
        err
    );
    assert_eq!(std::fs::read_dir(h.storage.base_path()).unwrap().count(), 0);

    let longest = format!("{}.jpg", "a".repeat(214));
    let id = h
        .service
        .upload(request(b"jpeg", &longest, "image/jpeg"))
        .await
        .unwrap();
    assert_eq!(h.service.download(id).await.unwrap().stored_name.len(), 255);
}

#[tokio::test]
async fn test_control_characters_in_filename_rejected() {
    let h = harness(&[]).await;

    let err = h
        .service
        .upload(request(b"text", "a\nb.txt", "text/plain"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(ref msg) if msg.contains("control characters")));
    assert!(h.service.list_all().await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(h.storage.base_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_content_type_uses_default() {
    let h = harness(&[]).await;
    let id = h
        .service
        .upload(UploadRequest {
            data: Bytes::from_static(b"blob"),
            content_type: None,
            original_filename: "data".to_string(),
        })
        .await
        .unwrap();

    let records = h.service.lookup_many(&[id]).await.unwrap();
    assert_eq!(records[0].mime_type, "application/octet-stream");
    assert_eq!(records[0].file_extension, "");
}

#[tokio::test]
async fn test_list_reports_sizes_and_extensions() {
    let h = harness(&[]).await;
    h.service
        .upload(request(b"content1", "test1.jpg", "image/jpeg"))
        .await
        .unwrap();
    h.service
        .upload(request(b"content2Different", "test2.png", "image/png"))
        .await
        .unwrap();

    let mut summary: Vec<(i64, String)> = h
        .service
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.size_bytes, r.file_extension))
        .collect();
    summary.sort();
    assert_eq!(
        summary,
        vec![(8, "jpg".to_string()), (17, "png".to_string())]
    );
}

#[tokio::test]
async fn test_lookup_many_omits_unknown_ids() {
    let h = harness(&[]).await;
    let id = h
        .service
        .upload(request(b"x", "x.bin", "application/octet-stream"))
        .await
        .unwrap();
    h.service
        .upload(request(b"y", "y.bin", "application/octet-stream"))
        .await
        .unwrap();

    let records = h
        .service
        .lookup_many(&[id, Uuid::new_v4(), id])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
}

#[tokio::test]
async fn test_same_name_uploaded_twice() {
    let h = harness(&[]).await;
    let first = h
        .service
        .upload(request(b"one", "photo.jpg", "image/jpeg"))
        .await
        .unwrap();
    let second = h
        .service
        .upload(request(b"two", "photo.jpg", "image/jpeg"))
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(collect(h.service.download(first).await.unwrap().stream).await, b"one");
    assert_eq!(collect(h.service.download(second).await.unwrap().stream).await, b"two");
}

#[tokio::test]
async fn test_delete_twice_is_not_found() {
    let h = harness(&[]).await;
    let id = h
        .service
        .upload(request(b"bye", "bye.txt", "text/plain"))
        .await
        .unwrap();

    h.service.delete(id).await.unwrap();
    assert!(matches!(h.service.delete(id).await, Err(AppError::NotFound(_))));
    assert!(matches!(h.service.download(id).await, Err(AppError::NotFound(_))));
    assert_eq!(std::fs::read_dir(h.storage.base_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let h = harness(&[]).await;
    assert!(matches!(
        h.service.download(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.service.delete(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_missing_blob_is_inconsistent_not_not_found() {
    let h = harness(&[]).await;
    let id = h
        .service
        .upload(request(b"gone", "gone.txt", "text/plain"))
        .await
        .unwrap();
    h.storage
        .delete(&format!("{}_gone.txt", id))
        .await
        .unwrap();

    assert!(matches!(
        h.service.download(id).await,
        Err(AppError::Inconsistent(_))
    ));
}

#[tokio::test]
async fn test_delete_with_missing_blob_removes_record() {
    let h = harness(&[]).await;
    let id = h
        .service
        .upload(request(b"gone", "gone.txt", "text/plain"))
        .await
        .unwrap();
    h.storage
        .delete(&format!("{}_gone.txt", id))
        .await
        .unwrap();

    h.service.delete(id).await.unwrap();
    assert!(h.repository.find_by_id(id).await.unwrap().is_none());
}

/// Repository whose inserts and deletes can be switched to fail.
#[derive(Default)]
struct FlakyRepository {
    inner: InMemoryFileRepository,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait::async_trait]
impl FileRepository for FlakyRepository {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.insert(record).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FileRecord>, AppError> {
        self.inner.find_by_ids(ids).await
    }

    async fn find_all(&self) -> Result<Vec<FileRecord>, AppError> {
        self.inner.find_all().await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable("connection reset".to_string()));
        }
        self.inner.delete_by_id(id).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend(&self) -> MetadataBackend {
        MetadataBackend::Memory
    }
}

/// Storage whose writes or deletes can be switched to fail.
struct FlakyStorage {
    inner: LocalStorage,
    write_collides: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait::async_trait]
impl Storage for FlakyStorage {
    async fn write_create_only(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.write_collides.load(Ordering::SeqCst) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        self.inner.write_create_only(key, data).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn open_read(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.open_read(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }
        self.inner.delete(key).await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

struct FlakyHarness {
    service: FileService,
    repository: Arc<FlakyRepository>,
    storage: Arc<FlakyStorage>,
    _dir: TempDir,
}

async fn flaky_harness() -> FlakyHarness {
    let dir = tempfile::tempdir().expect("tempdir");
    let repository = Arc::new(FlakyRepository::default());
    let storage = Arc::new(FlakyStorage {
        inner: LocalStorage::new(dir.path()).await.expect("storage"),
        write_collides: AtomicBool::new(false),
        fail_delete: AtomicBool::new(false),
    });
    let service = FileService::new(repository.clone(), storage.clone(), &config(&[]));
    FlakyHarness {
        service,
        repository,
        storage,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_metadata_failure_after_write_leaves_orphan() {
    let h = flaky_harness().await;
    h.repository.fail_insert.store(true, Ordering::SeqCst);

    let err = h
        .service
        .upload(request(b"orphan", "orphan.txt", "text/plain"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));

    // The blob stays behind for offline cleanup.
    let blobs: Vec<_> = std::fs::read_dir(h.storage.inner.base_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(blobs.len(), 1);
    assert!(blobs[0].ends_with("_orphan.txt"));
    assert!(h.service.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_name_collision_is_conflict() {
    let h = flaky_harness().await;
    h.storage.write_collides.store(true, Ordering::SeqCst);

    let err = h
        .service
        .upload(request(b"data", "a.txt", "text/plain"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(h.service.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blob_delete_failure_keeps_record() {
    let h = flaky_harness().await;
    let id = h
        .service
        .upload(request(b"keep", "keep.txt", "text/plain"))
        .await
        .unwrap();
    h.storage.fail_delete.store(true, Ordering::SeqCst);

    let err = h.service.delete(id).await.unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
    assert!(h.repository.find_by_id(id).await.unwrap().is_some());
    assert_eq!(collect(h.service.download(id).await.unwrap().stream).await, b"keep");
}

#[tokio::test]
async fn test_metadata_delete_failure_is_unavailable() {
    let h = flaky_harness().await;
    let id = h
        .service
        .upload(request(b"half", "half.txt", "text/plain"))
        .await
        .unwrap();
    h.repository.fail_delete.store(true, Ordering::SeqCst);

    let err = h.service.delete(id).await.unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
    // The record now points at a blob that no longer exists.
    assert!(matches!(
        h.service.download(id).await,
        Err(AppError::Inconsistent(_))
    ));
}
