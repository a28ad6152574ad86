use std::collections::HashMap;

use filestash_core::models::FileRecord;
use filestash_core::{AppError, MetadataBackend};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::file::FileRepository;

/// Metadata kept in process memory. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryFileRepository {
    records: RwLock<HashMap<Uuid, FileRecord>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut records: Vec<FileRecord>) -> Vec<FileRecord> {
    records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
    records
}

#[async_trait::async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;

        let taken = records.contains_key(&record.id)
            || records
                .values()
                .any(|existing| existing.stored_name == record.stored_name);
        if taken {
            return Err(AppError::Conflict(format!(
                "file record {} / {} already exists",
                record.id, record.stored_name
            )));
        }

        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FileRecord>, AppError> {
        let records = self.records.read().await;
        let mut found = sorted(
            ids.iter()
                .filter_map(|id| records.get(id).cloned())
                .collect(),
        );
        found.dedup_by_key(|record| record.id);
        Ok(found)
    }

    async fn find_all(&self) -> Result<Vec<FileRecord>, AppError> {
        let records = self.records.read().await;
        Ok(sorted(records.values().cloned().collect()))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend(&self) -> MetadataBackend {
        MetadataBackend::Memory
    }
}
