//! Asset lifecycle engine.

mod bulk;
mod duplicates;
mod service;
mod types;
mod upload;

pub use duplicates::rank_candidates;
pub use service::AssetService;
pub use types::UploadRequest;
