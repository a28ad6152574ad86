use bytes::Bytes;
use filestash_storage::ByteStream;

/// A file received from a client, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    /// Declared content type. `None` or blank falls back to the configured default.
    pub content_type: Option<String>,
    pub original_filename: String,
}

/// An opened file ready to be streamed to a client.
pub struct FileDownload {
    pub stream: ByteStream,
    pub content_type: String,
    pub stored_name: String,
    pub size_bytes: i64,
    pub cache_control: String,
}

impl FileDownload {
    /// `attachment; filename="{stored_name}"`, with quotes and backslashes escaped.
    pub fn content_disposition(&self) -> String {
        let escaped = self
            .stored_name
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        format!("attachment; filename=\"{}\"", escaped)
    }
}

impl std::fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDownload")
            .field("content_type", &self.content_type)
            .field("stored_name", &self.stored_name)
            .field("size_bytes", &self.size_bytes)
            .field("cache_control", &self.cache_control)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(stored_name: &str) -> FileDownload {
        FileDownload {
            stream: Box::pin(futures::stream::empty()),
            content_type: "image/jpeg".to_string(),
            stored_name: stored_name.to_string(),
            size_bytes: 0,
            cache_control: "public, max-age=3600".to_string(),
        }
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            download("abc_a.jpg").content_disposition(),
            "attachment; filename=\"abc_a.jpg\""
        );
        assert_eq!(
            download("abc_say \"hi\".txt").content_disposition(),
            "attachment; filename=\"abc_say \\\"hi\\\".txt\""
        );
    }
}
