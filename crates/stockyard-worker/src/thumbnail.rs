//! Thumbnail generation for one asset.
//!
//! Drives the thumbnail state machine: `pending → processing → complete | failed`.
//! Thumbnails written during a failed attempt are deleted again.

use std::sync::Arc;

use stockyard_core::constants::{THUMBNAIL_LARGE_PX, THUMBNAIL_MEDIUM_PX, THUMBNAIL_SMALL_PX};
use stockyard_core::models::{Asset, ThumbnailPaths, ThumbnailStatus};
use stockyard_core::AppError;
use stockyard_db::AssetRepository;
use stockyard_processing::{ImageAnalyzer, SimilarityHasher};
use stockyard_services::cleanup::delete_objects_best_effort;
use stockyard_storage::Storage;
use uuid::Uuid;

const THUMBNAIL_SIZES: [(&str, u32); 3] = [
    ("small", THUMBNAIL_SMALL_PX),
    ("medium", THUMBNAIL_MEDIUM_PX),
    ("large", THUMBNAIL_LARGE_PX),
];

/// What one run did to the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    Completed(ThumbnailPaths),
    /// The attempt ran and the asset is now `failed` with this error text.
    Failed(String),
    /// The asset was not `pending`, usually because another run got there first.
    Skipped(ThumbnailStatus),
}

#[derive(Clone)]
pub struct ThumbnailWorker {
    repository: Arc<dyn AssetRepository>,
    storage: Arc<dyn Storage>,
    analyzer: Arc<dyn ImageAnalyzer>,
    hasher: Option<Arc<dyn SimilarityHasher>>,
}

impl ThumbnailWorker {
    pub fn new(
        repository: Arc<dyn AssetRepository>,
        storage: Arc<dyn Storage>,
        analyzer: Arc<dyn ImageAnalyzer>,
    ) -> Self {
        Self {
            repository,
            storage,
            analyzer,
            hasher: None,
        }
    }

    /// Also compute the perceptual signature of assets that have none.
    pub fn with_hasher(mut self, hasher: Arc<dyn SimilarityHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Generate the three thumbnails of `asset_id`.
    ///
    /// Returns `Ok` for every attempt that reached a terminal state, including
    /// `Failed`. `Err` means the state itself could not be read or written.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id))]
    pub async fn process(&self, asset_id: Uuid) -> Result<ThumbnailOutcome, AppError> {
        let asset = self
            .repository
            .get_by_id(asset_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", asset_id)))?;

        if asset.thumbnails.status != ThumbnailStatus::Pending {
            tracing::debug!(status = %asset.thumbnails.status, "Asset not pending, skipping");
            return Ok(ThumbnailOutcome::Skipped(asset.thumbnails.status));
        }

        let asset = match self.repository.mark_thumbnail_processing(asset_id).await {
            Ok(asset) => asset,
            Err(AppError::InvalidStateTransition { from, .. }) => {
                tracing::debug!(status = %from, "Asset claimed by another run, skipping");
                let status = from.parse().unwrap_or(ThumbnailStatus::Processing);
                return Ok(ThumbnailOutcome::Skipped(status));
            }
            Err(e) => return Err(e),
        };
        tracing::info!(attempt = asset.thumbnails.attempts, "Generating thumbnails");

        let result = match self.storage.get(&asset.storage_path).await {
            Ok(original) => {
                self.record_signature(&asset, &original).await;
                self.generate(&asset, &original).await
            }
            Err(e) => Err(AppError::from(e)),
        };

        match result {
            Ok(paths) => match self.repository.mark_thumbnail_complete(asset_id, &paths).await {
                Ok(_) => {
                    tracing::info!("Thumbnails complete");
                    Ok(ThumbnailOutcome::Completed(paths))
                }
                Err(e) => {
                    delete_objects_best_effort(
                        &self.storage,
                        [&paths.small, &paths.medium, &paths.large],
                    )
                    .await;
                    self.fail(asset_id, &e.to_string()).await?;
                    Err(e)
                }
            },
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "Thumbnail generation failed");
                self.fail(asset_id, &message).await?;
                Ok(ThumbnailOutcome::Failed(message))
            }
        }
    }

    async fn fail(&self, asset_id: Uuid, message: &str) -> Result<(), AppError> {
        self.repository
            .mark_thumbnail_failed(asset_id, message)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to record thumbnail failure");
                e
            })
    }

    /// Render and store every size. Anything written is deleted if a later size fails.
    async fn generate(&self, asset: &Asset, original: &[u8]) -> Result<ThumbnailPaths, AppError> {
        let mut written = Vec::with_capacity(THUMBNAIL_SIZES.len());
        match self.write_sizes(asset, original, &mut written).await {
            Ok(paths) => Ok(paths),
            Err(e) => {
                delete_objects_best_effort(&self.storage, &written).await;
                Err(e)
            }
        }
    }

    async fn write_sizes(
        &self,
        asset: &Asset,
        original: &[u8],
        written: &mut Vec<String>,
    ) -> Result<ThumbnailPaths, AppError> {
        for (label, max_edge) in THUMBNAIL_SIZES {
            let bytes = self.analyzer.render_thumbnail(original, max_edge).await?;
            let filename = format!("{}_{}.jpg", asset.id, label);
            let key = self
                .storage
                .save(asset.tenant_id, asset.parent_id, &filename, bytes)
                .await?;
            written.push(key);
        }

        match written.as_slice() {
            [small, medium, large] => Ok(ThumbnailPaths {
                small: small.clone(),
                medium: medium.clone(),
                large: large.clone(),
            }),
            _ => Err(AppError::Internal(format!(
                "Expected 3 thumbnails, wrote {}",
                written.len()
            ))),
        }
    }

    /// Set-once signature; failures are logged and never fail the job.
    async fn record_signature(&self, asset: &Asset, original: &[u8]) {
        let Some(hasher) = self.hasher.as_deref() else {
            return;
        };
        if asset.perceptual_hash.is_some() {
            return;
        }

        match hasher.signature_from_bytes(original).await {
            Ok(signature) => match self.repository.set_signature(asset.id, signature).await {
                Ok(true) => tracing::debug!("Perceptual signature stored"),
                Ok(false) => tracing::debug!("Perceptual signature already present"),
                Err(e) => tracing::warn!(error = %e, "Failed to store perceptual signature"),
            },
            Err(e) => tracing::warn!(error = %e, "Failed to compute perceptual signature"),
        }
    }
}
