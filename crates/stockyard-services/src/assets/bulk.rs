//! Batch mutations over several assets.

use std::collections::HashSet;

use stockyard_core::models::{Asset, CaptionUpdate};
use stockyard_core::AppError;
use uuid::Uuid;

use super::service::AssetService;
use crate::cleanup::delete_objects_best_effort;

impl AssetService {
    /// Delete several assets of one parent.
    ///
    /// Every id must name an asset of the tenant attached to `parent_id`;
    /// otherwise nothing is deleted. Records go in one repository call, then
    /// storage objects are removed best-effort and the primary flag repaired.
    /// Returns the number of records removed.
    #[tracing::instrument(skip(self, asset_ids), fields(parent_id = %parent_id, tenant_id = %tenant_id, count = asset_ids.len()))]
    pub async fn bulk_delete(
        &self,
        parent_id: Uuid,
        tenant_id: Uuid,
        asset_ids: &[Uuid],
    ) -> Result<u64, AppError> {
        if asset_ids.is_empty() {
            return Ok(0);
        }

        let mut unique = HashSet::with_capacity(asset_ids.len());
        let ids: Vec<Uuid> = asset_ids
            .iter()
            .copied()
            .filter(|id| unique.insert(*id))
            .collect();

        let assets = self.repository.get_by_ids(tenant_id, &ids).await?;

        if let Some(stranger) = assets.iter().find(|a| a.parent_id != parent_id) {
            return Err(AppError::Unauthorized(format!(
                "Asset {} does not belong to parent {}",
                stranger.id, parent_id
            )));
        }
        if assets.len() != ids.len() {
            let found: HashSet<Uuid> = assets.iter().map(|a| a.id).collect();
            let missing = ids.iter().find(|id| !found.contains(id)).copied();
            return Err(AppError::NotFound(format!(
                "Asset {} not found",
                missing.map(|id| id.to_string()).unwrap_or_default()
            )));
        }

        let deleted = self.repository.bulk_delete(tenant_id, &ids).await?;

        let paths: Vec<&str> = assets.iter().flat_map(|a| a.storage_paths()).collect();
        delete_objects_best_effort(&self.storage, paths).await;

        self.reassign_primary(tenant_id, parent_id).await?;

        tracing::info!(deleted = deleted, "Assets bulk deleted");
        Ok(deleted)
    }

    /// Apply caption updates in order, stopping at the first failure.
    ///
    /// Updates applied before the failure stay applied.
    #[tracing::instrument(skip(self, updates), fields(tenant_id = %tenant_id, count = updates.len()))]
    pub async fn bulk_update_captions(
        &self,
        tenant_id: Uuid,
        updates: &[CaptionUpdate],
    ) -> Result<Vec<Asset>, AppError> {
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let asset = self
                .update_caption(update.asset_id, tenant_id, update.caption.clone())
                .await
                .map_err(|e| {
                    tracing::warn!(
                        asset_id = %update.asset_id,
                        applied = updated.len(),
                        error = %e,
                        "Bulk caption update stopped"
                    );
                    e
                })?;
            updated.push(asset);
        }
        Ok(updated)
    }
}
