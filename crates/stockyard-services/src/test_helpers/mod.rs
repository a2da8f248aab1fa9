//! Test helpers for engine and worker tests
//!
//! In-memory doubles for the repository and every port, so the lifecycle
//! engine can be exercised without a database, a filesystem or real images.

pub mod fixtures;
pub mod mock_ports;
pub mod mock_repository;
pub mod mock_storage;

pub use fixtures::*;
pub use mock_ports::*;
pub use mock_repository::MockAssetRepository;
pub use mock_storage::MockStorage;
