//! Ports consumed by the asset engine and the thumbnail worker.

use async_trait::async_trait;
use std::path::Path;
use stockyard_core::models::AssetMime;

use crate::ProcessingError;

/// Image validation, measurement and thumbnail rendering.
///
/// Decoding is CPU-bound; implementations must not block the async runtime.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Confirm the file decodes as an image of the declared type.
    async fn validate(&self, path: &Path, declared: AssetMime) -> Result<(), ProcessingError>;

    /// Pixel dimensions as (width, height).
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProcessingError>;

    /// Render a JPEG whose longest edge is at most `max_edge` pixels.
    async fn render_thumbnail(&self, data: &[u8], max_edge: u32)
        -> Result<Vec<u8>, ProcessingError>;
}

/// Result of comparing two perceptual signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityMatch {
    pub is_similar: bool,
    pub distance: u32,
}

/// Perceptual signatures for near-duplicate matching.
#[async_trait]
pub trait SimilarityHasher: Send + Sync {
    /// Signature of in-memory image bytes.
    async fn signature_from_bytes(&self, data: &[u8]) -> Result<i64, ProcessingError>;

    /// Signature of the image stored at `path`.
    async fn generate_signature(&self, path: &Path) -> Result<i64, ProcessingError> {
        let data = tokio::fs::read(path).await?;
        self.signature_from_bytes(&data).await
    }

    fn compare(&self, a: i64, b: i64) -> SimilarityMatch;
}
