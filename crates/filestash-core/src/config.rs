//! Configuration module
//!
//! Configuration is read once at startup from the environment (a `.env` file is
//! honoured) and then passed by value into the services that need it.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::validation::{MimeFilterMode, UploadPolicy};

// Common constants
const SERVER_PORT: u16 = 8080;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const MAX_FILE_SIZE_BYTES: usize = 1_048_576;
const MIN_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;
const DOWNLOAD_CACHE_MAX_AGE_SECS: u64 = 3600;
const FILE_DIRECTORY: &str = "uploads";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Where file metadata records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    Postgres,
    Memory,
}

impl FromStr for MetadataBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(MetadataBackend::Postgres),
            "memory" => Ok(MetadataBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid metadata backend: {}", s)),
        }
    }
}

impl Display for MetadataBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataBackend::Postgres => write!(f, "postgres"),
            MetadataBackend::Memory => write!(f, "memory"),
        }
    }
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub request_timeout_secs: u64,
    pub http_concurrency_limit: usize,
    pub max_request_body_bytes: usize,
    /// Emit logs as JSON lines instead of the compact console format
    pub log_json: bool,
}

/// File storage configuration
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    pub base: BaseConfig,
    // Metadata store
    pub metadata_backend: MetadataBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Blob store
    pub file_directory: String,
    // Upload rules
    pub max_file_size_bytes: usize,
    pub limited_file_types: Vec<String>,
    pub file_type_limiting_mode: MimeFilterMode,
    pub default_mime_type: String,
    // Download
    pub download_cache_max_age_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<FileStoreConfig>);

impl Default for Config {
    /// Development defaults: in-memory metadata, `uploads/` directory, 1 MiB limit.
    fn default() -> Self {
        Config(Box::new(FileStoreConfig {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                request_timeout_secs: REQUEST_TIMEOUT_SECS,
                http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
                max_request_body_bytes: default_request_body_limit(MAX_FILE_SIZE_BYTES),
                log_json: false,
            },
            metadata_backend: MetadataBackend::Memory,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            file_directory: FILE_DIRECTORY.to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
            limited_file_types: Vec::new(),
            file_type_limiting_mode: MimeFilterMode::Include,
            default_mime_type: DEFAULT_MIME_TYPE.to_string(),
            download_cache_max_age_secs: DOWNLOAD_CACHE_MAX_AGE_SECS,
        }))
    }
}

impl Config {
    fn inner(&self) -> &FileStoreConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let max_file_size_bytes = parse_or(&lookup, "MAX_FILE_SIZE_BYTES", MAX_FILE_SIZE_BYTES)?;

        let base = BaseConfig {
            server_port: parse_or(&lookup, "PORT", SERVER_PORT)?,
            cors_origins: split_list(&cors_origins_str),
            environment,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS)?
                .max(1),
            http_concurrency_limit: parse_or(
                &lookup,
                "HTTP_CONCURRENCY_LIMIT",
                HTTP_CONCURRENCY_LIMIT,
            )?
            .max(1),
            max_request_body_bytes: parse_or(
                &lookup,
                "MAX_REQUEST_BODY_BYTES",
                default_request_body_limit(max_file_size_bytes),
            )?,
            log_json: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                None | Some("") | Some("compact") => false,
                Some("json") => true,
                Some(other) => {
                    return Err(anyhow::anyhow!(
                        "Invalid LOG_FORMAT: {}. Must be 'compact' or 'json'",
                        other
                    ))
                }
            },
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let metadata_backend = match lookup("METADATA_BACKEND") {
            Some(value) => value.parse()?,
            None if database_url.is_some() => MetadataBackend::Postgres,
            None => MetadataBackend::Memory,
        };

        let file_type_limiting_mode = match lookup("FILE_TYPE_LIMITING_MODE") {
            Some(value) => value.parse()?,
            None => MimeFilterMode::Include,
        };

        let config = FileStoreConfig {
            base,
            metadata_backend,
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", MAX_CONNECTIONS)?,
            db_timeout_seconds: parse_or(&lookup, "DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS)?,
            file_directory: lookup("FILE_DIRECTORY").unwrap_or_else(|| FILE_DIRECTORY.to_string()),
            max_file_size_bytes,
            limited_file_types: lookup("LIMITED_FILE_TYPES")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            file_type_limiting_mode,
            default_mime_type: lookup("DEFAULT_MIME_TYPE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            download_cache_max_age_secs: parse_or(
                &lookup,
                "DOWNLOAD_CACHE_MAX_AGE_SECS",
                DOWNLOAD_CACHE_MAX_AGE_SECS,
            )?,
        };

        let config = Config(Box::new(config));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let c = self.inner();
        if c.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }
        if c.metadata_backend == MetadataBackend::Postgres && c.database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be set when METADATA_BACKEND is postgres"
            ));
        }
        if c.file_directory.trim().is_empty() {
            return Err(anyhow::anyhow!("FILE_DIRECTORY must not be empty"));
        }
        Ok(())
    }

    /// Upload rules derived from the size limit and the mime type list.
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(
            self.inner().max_file_size_bytes,
            self.inner().limited_file_types.clone(),
            self.inner().file_type_limiting_mode,
        )
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.inner().base.request_timeout_secs
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.inner().base.max_request_body_bytes
    }

    pub fn log_json(&self) -> bool {
        self.inner().base.log_json
    }

    pub fn metadata_backend(&self) -> MetadataBackend {
        self.inner().metadata_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn file_directory(&self) -> &str {
        &self.inner().file_directory
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn limited_file_types(&self) -> &[String] {
        &self.inner().limited_file_types
    }

    pub fn file_type_limiting_mode(&self) -> MimeFilterMode {
        self.inner().file_type_limiting_mode
    }

    pub fn default_mime_type(&self) -> &str {
        &self.inner().default_mime_type
    }

    pub fn download_cache_max_age_secs(&self) -> u64 {
        self.inner().download_cache_max_age_secs
    }
}

fn is_production_name(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

/// The HTTP body cap sits well above the validation limit so that oversized uploads
/// reach validation and get a descriptive rejection instead of a bare 413.
fn default_request_body_limit(max_file_size_bytes: usize) -> usize {
    max_file_size_bytes
        .saturating_mul(4)
        .max(MIN_REQUEST_BODY_BYTES)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number (got '{}')", key, raw)),
        _ => Ok(default),
    }
}
