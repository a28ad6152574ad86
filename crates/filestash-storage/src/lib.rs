//! Filestash Storage Library
//!
//! Blob storage abstraction and the local filesystem implementation.
//!
//! # Key format
//!
//! Keys are flat file names (`{id}_{original_name}`). They must be a single path
//! component: no separators, no `..`, no leading `/`.

pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
