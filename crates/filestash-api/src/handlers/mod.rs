pub mod files;
pub mod status;
