//! Filestash Core Library
//!
//! Domain model, error taxonomy, configuration and upload validation shared by
//! every filestash crate.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, MetadataBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::{MimeFilterMode, UploadPolicy, ValidationError};
