use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::AppError;

/// Filesystem limit for one path component.
const MAX_STORED_NAME_LENGTH: usize = 255;

/// `{uuid}_` prepended to the original name when the blob is written.
const STORED_NAME_PREFIX_LENGTH: usize = 37;

const MAX_FILENAME_LENGTH: usize = MAX_STORED_NAME_LENGTH - STORED_NAME_PREFIX_LENGTH;

/// Upload validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Invalid file type")]
    ContentTypeNotAllowed { content_type: String },

    #[error("File exceeds maximum file size of {max}")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// How the configured mime type list is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeFilterMode {
    /// Only listed types are accepted
    #[default]
    Include,
    /// Listed types are rejected, everything else accepted
    Exclude,
}

impl FromStr for MimeFilterMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "include" | "true" => Ok(MimeFilterMode::Include),
            "exclude" | "false" => Ok(MimeFilterMode::Exclude),
            _ => Err(anyhow::anyhow!(
                "Invalid mime filter mode: {}. Must be 'include' or 'exclude'",
                s
            )),
        }
    }
}

impl Display for MimeFilterMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MimeFilterMode::Include => write!(f, "include"),
            MimeFilterMode::Exclude => write!(f, "exclude"),
        }
    }
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

/// Rules every upload must pass before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_size: usize,
    pub mime_types: Vec<String>,
    pub mode: MimeFilterMode,
}

impl UploadPolicy {
    pub fn new(max_file_size: usize, mime_types: Vec<String>, mode: MimeFilterMode) -> Self {
        Self {
            max_file_size,
            mime_types: mime_types
                .iter()
                .map(|t| normalize_mime_type(t))
                .filter(|t| !t.is_empty())
                .collect(),
            mode,
        }
    }

    pub fn validate_not_empty(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        Ok(())
    }

    /// An empty list accepts everything regardless of mode.
    pub fn is_mime_type_allowed(&self, content_type: &str) -> bool {
        if self.mime_types.is_empty() {
            return true;
        }

        let listed = self
            .mime_types
            .contains(&normalize_mime_type(content_type));

        match self.mode {
            MimeFilterMode::Include => listed,
            MimeFilterMode::Exclude => !listed,
        }
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if !self.is_mime_type_allowed(content_type) {
            return Err(ValidationError::ContentTypeNotAllowed {
                content_type: content_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// The name becomes part of a path inside the storage directory and of the
    /// download's `Content-Disposition` header. Once prefixed with the file id it must
    /// still be a single path component within the filesystem name limit.
    pub fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        if filename.contains('/') || filename.contains('\\') {
            return Err(ValidationError::InvalidFilename(
                "path separators are not allowed".to_string(),
            ));
        }
        if filename.chars().any(char::is_control) {
            return Err(ValidationError::InvalidFilename(
                "control characters are not allowed".to_string(),
            ));
        }
        if filename.len() > MAX_FILENAME_LENGTH {
            return Err(ValidationError::InvalidFilename(format!(
                "name longer than {} bytes",
                MAX_FILENAME_LENGTH
            )));
        }
        Ok(())
    }

    /// Run every rule in order: empty, mime type, size, filename.
    pub fn validate_all(
        &self,
        size: usize,
        content_type: &str,
        filename: &str,
    ) -> Result<(), ValidationError> {
        self.validate_not_empty(size)?;
        self.validate_content_type(content_type)?;
        self.validate_file_size(size)?;
        self.validate_filename(filename)?;
        Ok(())
    }
}
