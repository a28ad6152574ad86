//! Test helpers: build AppState and router for integration tests.
//!
//! Metadata is kept in memory and blobs in a temporary directory, so these tests need
//! no external services.

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use filestash_api::setup::routes;
use filestash_api::AppState;
use filestash_core::Config;
use filestash_services::{FileService, InMemoryFileRepository, LocalStorage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Setup a test app with default configuration.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Setup a test app; `vars` override configuration keys as if they were set in the environment.
pub async fn setup_test_app_with(vars: &[(&str, &str)]) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir.path().to_string_lossy().to_string();

    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.insert("FILE_DIRECTORY".to_string(), storage_path.clone());
    env.insert("METADATA_BACKEND".to_string(), "memory".to_string());
    let config = Config::from_lookup(|key| env.get(key).cloned()).expect("Invalid test config");

    let storage = Arc::new(
        LocalStorage::new(&storage_path)
            .await
            .expect("Failed to create local storage"),
    );
    let repository = Arc::new(InMemoryFileRepository::new());
    let files = FileService::new(repository, storage, &config);
    let state = Arc::new(AppState::new(files));

    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp { server, temp_dir }
}

/// Multipart form with one `file` part.
pub fn file_form(data: &[u8], file_name: &str, mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_type(mime_type),
    )
}

/// Upload a file and return its token.
pub async fn upload(client: &TestServer, data: &[u8], file_name: &str, mime_type: &str) -> String {
    let response = client
        .post("/api/files")
        .multipart(file_form(data, file_name, mime_type))
        .await;
    assert_eq!(response.status_code(), 200, "upload failed: {}", response.text());

    let body: serde_json::Value = response.json();
    body["id"].as_str().expect("id in response").to_string()
}
