//! Stockyard Services Layer
//!
//! Hosts the asset lifecycle engine: the upload pipeline, primary and ordering
//! rules, bulk mutation and duplicate detection. Persistence, storage and image
//! analysis are reached through the ports defined in the db, storage and
//! processing crates; thumbnail generation is handed off through
//! [`ThumbnailEnqueuer`].

pub mod assets;
pub mod cleanup;
pub mod enqueue;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use assets::{AssetService, UploadRequest};
pub use enqueue::{NoopEnqueuer, ThumbnailEnqueuer};
pub use stockyard_db::AssetRepository;
pub use stockyard_processing::{ImageAnalyzer, SimilarityHasher, SimilarityMatch};
pub use stockyard_storage::{Storage, StorageBackend, StorageError, StorageResult};
