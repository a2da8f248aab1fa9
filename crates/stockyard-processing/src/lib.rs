//! Stockyard Processing Library
//!
//! Image analysis (validation, dimensions, thumbnail rendering) and perceptual
//! hashing for near-duplicate detection.

pub mod analysis;
pub mod error;
pub mod similarity;
pub mod traits;

pub use analysis::ImageProcessor;
pub use error::ProcessingError;
pub use similarity::DifferenceHasher;
pub use traits::{ImageAnalyzer, SimilarityHasher, SimilarityMatch};
