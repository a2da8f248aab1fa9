//! Stockyard Storage Library
//!
//! Blob storage abstraction for asset originals and thumbnails, plus the local
//! filesystem backend.
//!
//! # Storage key format
//!
//! Keys are scoped by tenant and parent record:
//! `assets/{tenant_id}/{parent_id}/{filename}`.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use stockyard_core::StorageBackend;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
