//! Repositories for file metadata
//
// Trait, PostgreSQL implementation and factory
pub mod file;
//
// In-process implementation for development and tests
pub mod memory;

pub use file::{create_file_repository, FileRepository, PostgresFileRepository};
pub use memory::InMemoryFileRepository;
