//! Asset lifecycle service
//!
//! Reads, primary selection, ordering, captions, single delete and thumbnail
//! retry. The upload pipeline, bulk mutations and duplicate search live in
//! sibling modules as further `impl AssetService` blocks.

use std::collections::HashSet;
use std::sync::Arc;

use stockyard_core::models::{Asset, ThumbnailStatus};
use stockyard_core::validation::validate_caption;
use stockyard_core::AppError;
use stockyard_db::AssetRepository;
use stockyard_processing::{ImageAnalyzer, SimilarityHasher};
use stockyard_storage::Storage;
use uuid::Uuid;

use crate::cleanup::delete_objects_best_effort;
use crate::enqueue::ThumbnailEnqueuer;

/// Orchestrates every asset operation exposed to the transport layer.
///
/// Stateless apart from its collaborators; safe to share across tasks.
#[derive(Clone)]
pub struct AssetService {
    pub(super) repository: Arc<dyn AssetRepository>,
    pub(super) storage: Arc<dyn Storage>,
    pub(super) analyzer: Arc<dyn ImageAnalyzer>,
    pub(super) hasher: Option<Arc<dyn SimilarityHasher>>,
    pub(super) enqueuer: Arc<dyn ThumbnailEnqueuer>,
}

impl AssetService {
    pub fn new(
        repository: Arc<dyn AssetRepository>,
        storage: Arc<dyn Storage>,
        analyzer: Arc<dyn ImageAnalyzer>,
        enqueuer: Arc<dyn ThumbnailEnqueuer>,
    ) -> Self {
        Self {
            repository,
            storage,
            analyzer,
            hasher: None,
            enqueuer,
        }
    }

    /// Enable duplicate detection.
    pub fn with_hasher(mut self, hasher: Arc<dyn SimilarityHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn repository(&self) -> &Arc<dyn AssetRepository> {
        &self.repository
    }

    /// Assets of a parent in display order.
    pub async fn list_by_parent(
        &self,
        parent_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Asset>, AppError> {
        self.repository.get_by_parent(tenant_id, parent_id).await
    }

    /// Fetch an asset, distinguishing "absent" from "owned by another tenant".
    pub async fn get_by_id(&self, asset_id: Uuid, tenant_id: Uuid) -> Result<Asset, AppError> {
        let asset = self
            .repository
            .get_by_id(asset_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", asset_id)))?;

        if asset.tenant_id != tenant_id {
            tracing::debug!(
                asset_id = %asset_id,
                tenant_id = %tenant_id,
                "Asset requested by a tenant that does not own it"
            );
            return Err(AppError::Unauthorized(format!(
                "Asset {} does not belong to this tenant",
                asset_id
            )));
        }

        Ok(asset)
    }

    /// Make the asset the only primary of its parent.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, tenant_id = %tenant_id))]
    pub async fn set_primary(&self, asset_id: Uuid, tenant_id: Uuid) -> Result<Asset, AppError> {
        let asset = self.get_by_id(asset_id, tenant_id).await?;

        self.repository
            .set_primary(tenant_id, asset.parent_id, asset.id)
            .await?;

        tracing::info!(parent_id = %asset.parent_id, "Primary asset changed");
        Ok(Asset {
            is_primary: true,
            ..asset
        })
    }

    /// Replace or clear the caption. `None` clears it.
    pub async fn update_caption(
        &self,
        asset_id: Uuid,
        tenant_id: Uuid,
        caption: Option<String>,
    ) -> Result<Asset, AppError> {
        validate_caption(caption.as_deref())?;
        self.get_by_id(asset_id, tenant_id).await?;

        self.repository
            .update_caption(tenant_id, asset_id, caption)
            .await
    }

    /// Assign display order 0..n following `ordered_ids`.
    ///
    /// `ordered_ids` must be exactly a permutation of the parent's current
    /// assets; otherwise nothing is written. Concurrent reorders of the same
    /// parent are last-write-wins.
    #[tracing::instrument(skip(self, ordered_ids), fields(parent_id = %parent_id, tenant_id = %tenant_id, count = ordered_ids.len()))]
    pub async fn reorder(
        &self,
        parent_id: Uuid,
        tenant_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<Asset>, AppError> {
        let current = self.repository.get_by_parent(tenant_id, parent_id).await?;
        validate_permutation(&current, ordered_ids)?;

        for (index, asset_id) in ordered_ids.iter().enumerate() {
            let display_order = i32::try_from(index).map_err(|_| {
                AppError::InvalidDisplayOrder(format!("Too many assets to order: {}", index))
            })?;
            self.repository
                .update_display_order(tenant_id, *asset_id, display_order)
                .await?;
        }

        tracing::info!("Assets reordered");
        self.repository.get_by_parent(tenant_id, parent_id).await
    }

    /// Delete the record, then its storage objects, then repair the primary flag.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, tenant_id = %tenant_id))]
    pub async fn delete(&self, asset_id: Uuid, tenant_id: Uuid) -> Result<(), AppError> {
        let asset = self.get_by_id(asset_id, tenant_id).await?;

        if !self.repository.delete(tenant_id, asset_id).await? {
            return Err(AppError::NotFound(format!("Asset {} not found", asset_id)));
        }

        delete_objects_best_effort(&self.storage, asset.storage_paths()).await;

        self.reassign_primary(tenant_id, asset.parent_id).await?;

        tracing::info!(parent_id = %asset.parent_id, "Asset deleted");
        Ok(())
    }

    /// Move a failed asset back to `pending` and hand it to the thumbnail queue again.
    #[tracing::instrument(skip(self), fields(asset_id = %asset_id, tenant_id = %tenant_id))]
    pub async fn retry_thumbnails(
        &self,
        asset_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Asset, AppError> {
        let asset = self.get_by_id(asset_id, tenant_id).await?;
        asset
            .thumbnails
            .status
            .ensure_transition(ThumbnailStatus::Pending)?;

        let asset = self
            .repository
            .reset_thumbnail_for_retry(tenant_id, asset_id)
            .await?;

        self.enqueue_thumbnails(asset.id);
        Ok(asset)
    }

    /// Give the primary flag to the first remaining asset if the parent has none.
    ///
    /// Runs after every delete: a concurrent `set_primary` may have moved the
    /// flag onto the deleted record after it was read.
    pub(super) async fn reassign_primary(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<(), AppError> {
        if let Some(promoted) = self.repository.ensure_primary(tenant_id, parent_id).await? {
            tracing::info!(
                asset_id = %promoted,
                parent_id = %parent_id,
                "Primary reassigned after delete"
            );
        }
        Ok(())
    }

    pub(super) fn enqueue_thumbnails(&self, asset_id: Uuid) {
        if let Err(e) = self.enqueuer.enqueue(asset_id) {
            tracing::warn!(
                asset_id = %asset_id,
                error = %e,
                "Failed to enqueue thumbnail job, asset stays pending"
            );
        }
    }
}

/// `ordered_ids` must name every current asset exactly once.
fn validate_permutation(current: &[Asset], ordered_ids: &[Uuid]) -> Result<(), AppError> {
    if ordered_ids.len() != current.len() {
        return Err(AppError::InvalidDisplayOrder(format!(
            "Expected {} asset ids, got {}",
            current.len(),
            ordered_ids.len()
        )));
    }

    let members: HashSet<Uuid> = current.iter().map(|a| a.id).collect();
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !members.contains(id) {
            return Err(AppError::InvalidDisplayOrder(format!(
                "Asset {} does not belong to this parent",
                id
            )));
        }
        if !seen.insert(*id) {
            return Err(AppError::InvalidDisplayOrder(format!(
                "Asset {} listed more than once",
                id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::asset_fixture;

    #[test]
    fn test_permutation_accepts_reordering() {
        let a = asset_fixture(Uuid::new_v4(), Uuid::new_v4());
        let b = asset_fixture(a.tenant_id, a.parent_id);
        assert!(validate_permutation(&[a.clone(), b.clone()], &[b.id, a.id]).is_ok());
        assert!(validate_permutation(&[], &[]).is_ok());
    }

    #[test]
    fn test_permutation_rejects_duplicates_and_strangers() {
        let a = asset_fixture(Uuid::new_v4(), Uuid::new_v4());
        let b = asset_fixture(a.tenant_id, a.parent_id);
        let current = [a.clone(), b.clone()];

        assert!(matches!(
            validate_permutation(&current, &[a.id, a.id]),
            Err(AppError::InvalidDisplayOrder(_))
        ));
        assert!(matches!(
            validate_permutation(&current, &[a.id, Uuid::new_v4()]),
            Err(AppError::InvalidDisplayOrder(_))
        ));
        assert!(matches!(
            validate_permutation(&current, &[a.id]),
            Err(AppError::InvalidDisplayOrder(_))
        ));
    }
}
