//! Stockyard Core Library
//!
//! Domain models, error types, configuration and upload validation shared by
//! every stockyard crate. Nothing in here performs I/O beyond reading the
//! environment.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
