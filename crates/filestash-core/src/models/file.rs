use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata for one stored file.
///
/// The blob lives in the storage directory under `stored_name`; the record is keyed
/// by `id`, which is also the token handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    pub stored_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_extension: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build the record for a freshly uploaded file, deriving the stored name and
    /// the extension from `original_name`.
    pub fn new(id: Uuid, original_name: &str, mime_type: &str, size_bytes: usize) -> Self {
        FileRecord {
            id,
            stored_name: stored_name_for(id, original_name),
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            file_extension: file_extension(original_name).to_string(),
            size_bytes: size_bytes as i64,
            uploaded_at: Utc::now(),
        }
    }
}

/// Name under which a file's bytes are written: `{id}_{original_name}`.
pub fn stored_name_for(id: Uuid, original_name: &str) -> String {
    format!("{}_{}", id, original_name)
}

/// Everything after the last `.` of `filename`, or `""` when there is no dot.
pub fn file_extension(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .unwrap_or("")
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub id: Uuid,
}

/// Body of the batch metadata lookup.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileTokensRequest {
    #[serde(alias = "tokens")]
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("test1.jpg"), "jpg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".env"), "env");
        assert_eq!(file_extension("trailing."), "");
        assert_eq!(file_extension(""), "");
    }

    #[test]
    fn test_new_record_derives_names() {
        let id = Uuid::new_v4();
        let record = FileRecord::new(id, "test2.png", "image/png", 17);

        assert_eq!(record.stored_name, format!("{}_test2.png", id));
        assert_eq!(record.original_name, "test2.png");
        assert_eq!(record.file_extension, "png");
        assert_eq!(record.size_bytes, 17);
        assert_eq!(record.mime_type, "image/png");
    }

    #[test]
    fn test_same_original_name_gives_distinct_stored_names() {
        let a = FileRecord::new(Uuid::new_v4(), "photo.jpg", "image/jpeg", 1);
        let b = FileRecord::new(Uuid::new_v4(), "photo.jpg", "image/jpeg", 1);
        assert_ne!(a.stored_name, b.stored_name);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = FileRecord::new(Uuid::new_v4(), "a.jpg", "image/jpeg", 8);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["originalName"], "a.jpg");
        assert_eq!(json["fileExtension"], "jpg");
        assert_eq!(json["sizeBytes"], 8);
        assert!(json.get("storedName").is_some());
        assert!(json.get("uploadedAt").is_some());
    }

    #[test]
    fn test_tokens_alias_accepted() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"tokens": ["{}"]}}"#, id);
        let request: FileTokensRequest = serde_json::from_str(&body).expect("deserialize");
        assert_eq!(request.ids, vec![id]);
    }
}
