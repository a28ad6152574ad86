use std::sync::Arc;

use filestash_core::models::FileRecord;
use filestash_core::{AppError, Config, MetadataBackend};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::memory::InMemoryFileRepository;

/// Trait for file metadata repository operations
/// This abstracts the metadata store (PostgreSQL or in-memory)
#[async_trait::async_trait]
pub trait FileRepository: Send + Sync {
    /// Store a new record. A duplicate id or stored name is a `Conflict`.
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;

    /// Records for the given ids, oldest upload first. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FileRecord>, AppError>;

    /// All records, oldest upload first.
    async fn find_all(&self) -> Result<Vec<FileRecord>, AppError>;

    /// Returns false when no record had this id.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;

    fn backend(&self) -> MetadataBackend;
}

#[derive(Clone)]
pub struct PostgresFileRepository {
    pool: PgPool,
}

impl PostgresFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(err: sqlx::Error, record: &FileRecord) -> AppError {
    let unique_violation = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        AppError::Conflict(format!(
            "file record {} / {} already exists",
            record.id, record.stored_name
        ))
    } else {
        AppError::Database(err)
    }
}

#[async_trait::async_trait]
impl FileRepository for PostgresFileRepository {
    #[tracing::instrument(skip(self, record), fields(
        db.system = "postgresql",
        db.table = "files",
        db.operation = "insert",
        db.record_id = %record.id
    ))]
    async fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO files (
                id, stored_name, original_name, mime_type, file_extension,
                size_bytes, uploaded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.stored_name)
        .bind(&record.original_name)
        .bind(&record.mime_type)
        .bind(&record.file_extension)
        .bind(record.size_bytes)
        .bind(record.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, record))?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "files",
        db.operation = "select",
        db.record_id = %id
    ))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, ids), fields(
        db.system = "postgresql",
        db.table = "files",
        db.operation = "select",
        ids = ids.len()
    ))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<FileRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<Postgres, FileRecord>(
            "SELECT * FROM files WHERE id = ANY($1) ORDER BY uploaded_at, id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "files",
        db.operation = "select"
    ))]
    async fn find_all(&self) -> Result<Vec<FileRecord>, AppError> {
        let records =
            sqlx::query_as::<Postgres, FileRecord>("SELECT * FROM files ORDER BY uploaded_at, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "files",
        db.operation = "delete",
        db.record_id = %id
    ))]
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> MetadataBackend {
        MetadataBackend::Postgres
    }
}

/// Factory function to create the metadata repository selected by configuration.
///
/// `postgres_pool` must be provided when the backend is PostgreSQL.
pub fn create_file_repository(
    config: &Config,
    postgres_pool: Option<PgPool>,
) -> Result<Arc<dyn FileRepository>, AppError> {
    match (config.metadata_backend(), postgres_pool) {
        (MetadataBackend::Postgres, Some(pool)) => {
            tracing::info!("Initializing PostgreSQL file repository");
            Ok(Arc::new(PostgresFileRepository::new(pool)))
        }
        (MetadataBackend::Postgres, None) => Err(AppError::Internal(
            "PostgreSQL metadata backend selected but no connection pool was provided"
                .to_string(),
        )),
        (MetadataBackend::Memory, _) => {
            tracing::warn!("Initializing in-memory file repository; metadata is lost on restart");
            Ok(Arc::new(InMemoryFileRepository::new()))
        }
    }
}
