//! Near-duplicate search over stored perceptual signatures.

use std::path::Path;

use stockyard_core::models::{similarity_percentage, Asset, DuplicateCandidate};
use stockyard_core::AppError;
use stockyard_processing::SimilarityHasher;
use uuid::Uuid;

use super::service::AssetService;

impl AssetService {
    /// Assets of the tenant (or of one parent) that look like `signature`,
    /// closest first. Without a configured hasher there are never any.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn check_duplicates(
        &self,
        tenant_id: Uuid,
        signature: i64,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<DuplicateCandidate>, AppError> {
        let Some(hasher) = self.hasher.as_deref() else {
            tracing::debug!("Similarity hashing not configured, skipping duplicate check");
            return Ok(Vec::new());
        };

        let stored = match parent_id {
            Some(parent_id) => {
                self.repository
                    .get_with_signatures_for_parent(tenant_id, parent_id)
                    .await?
            }
            None => self.repository.get_with_signatures(tenant_id).await?,
        };

        let candidates = rank_candidates(hasher, signature, &stored);
        tracing::debug!(
            compared = stored.len(),
            matches = candidates.len(),
            "Duplicate check complete"
        );
        Ok(candidates)
    }

    /// Signature of a candidate file, computed before it is uploaded.
    /// `None` when no hasher is configured.
    pub async fn compute_signature(&self, path: &Path) -> Result<Option<i64>, AppError> {
        match self.hasher.as_deref() {
            Some(hasher) => hasher
                .generate_signature(path)
                .await
                .map(Some)
                .map_err(|e| AppError::Similarity(e.to_string())),
            None => Ok(None),
        }
    }
}

/// Compare `signature` against every stored asset, keep the similar ones and
/// sort them by ascending distance. Ties keep repository order.
pub fn rank_candidates(
    hasher: &dyn SimilarityHasher,
    signature: i64,
    stored: &[Asset],
) -> Vec<DuplicateCandidate> {
    let mut candidates: Vec<DuplicateCandidate> = stored
        .iter()
        .filter_map(|asset| {
            let existing = asset.perceptual_hash?;
            let result = hasher.compare(signature, existing);
            result.is_similar.then(|| DuplicateCandidate {
                asset_id: asset.id,
                parent_id: asset.parent_id,
                original_filename: asset.original_filename.clone(),
                similarity_percent: similarity_percentage(result.distance),
                distance: result.distance,
            })
        })
        .collect();

    candidates.sort_by_key(|c| c.distance);
    candidates
}
