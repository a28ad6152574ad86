//! Filestash metadata persistence
//!
//! File records are kept either in PostgreSQL or in process memory; both sit behind
//! the [`FileRepository`] trait so the service layer never knows which one it has.

pub mod db;

pub use db::{
    create_file_repository, FileRepository, InMemoryFileRepository, PostgresFileRepository,
};
