//! Asset repository contract.
//!
//! The lifecycle engine and the thumbnail worker only talk to persistence
//! through this trait, so tests can substitute an in-memory implementation.

use async_trait::async_trait;
use stockyard_core::models::{Asset, NewAsset, ThumbnailPaths};
use stockyard_core::AppError;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Persist a new asset with thumbnail status `pending`.
    ///
    /// The record becomes primary exactly when its parent has no primary asset
    /// at insert time.
    async fn create(&self, asset: NewAsset) -> Result<Asset, AppError>;

    /// Fetch by id regardless of tenant; callers check ownership.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Asset>, AppError>;

    /// Assets of one parent ordered by display order, then creation.
    async fn get_by_parent(&self, tenant_id: Uuid, parent_id: Uuid)
        -> Result<Vec<Asset>, AppError>;

    async fn count_by_parent(&self, tenant_id: Uuid, parent_id: Uuid) -> Result<i64, AppError>;

    /// Assets of the tenant whose id is in `ids`. Unknown ids are skipped.
    async fn get_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<Asset>, AppError>;

    async fn update_display_order(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        display_order: i32,
    ) -> Result<(), AppError>;

    /// Make `id` the only primary asset of `parent_id` in one atomic operation.
    async fn set_primary(&self, tenant_id: Uuid, parent_id: Uuid, id: Uuid)
        -> Result<(), AppError>;

    /// Promote the first asset (by display order) when the parent has assets
    /// but no primary. Returns the promoted id, or `None` if nothing changed.
    async fn ensure_primary(&self, tenant_id: Uuid, parent_id: Uuid)
        -> Result<Option<Uuid>, AppError>;

    async fn update_caption(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        caption: Option<String>,
    ) -> Result<Asset, AppError>;

    /// Returns whether a record was removed.
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Returns the number of records removed.
    async fn bulk_delete(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<u64, AppError>;

    async fn get_with_signatures(&self, tenant_id: Uuid) -> Result<Vec<Asset>, AppError>;

    async fn get_with_signatures_for_parent(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Asset>, AppError>;

    /// Store the perceptual signature if none is set yet. Returns whether it was written.
    async fn set_signature(&self, id: Uuid, signature: i64) -> Result<bool, AppError>;

    /// pending -> processing, incrementing the attempt counter.
    async fn mark_thumbnail_processing(&self, id: Uuid) -> Result<Asset, AppError>;

    /// processing -> complete, recording the three thumbnail paths.
    async fn mark_thumbnail_complete(
        &self,
        id: Uuid,
        paths: &ThumbnailPaths,
    ) -> Result<Asset, AppError>;

    /// processing -> failed, recording the error text.
    async fn mark_thumbnail_failed(&self, id: Uuid, error: &str) -> Result<Asset, AppError>;

    /// failed -> pending, ahead of a retry.
    async fn reset_thumbnail_for_retry(&self, tenant_id: Uuid, id: Uuid)
        -> Result<Asset, AppError>;

    /// processing -> failed for every asset left in `processing` longer than
    /// `stale_after`, e.g. after a worker crash. Returns the affected ids.
    async fn fail_stale_thumbnails(
        &self,
        stale_after: Duration,
        error: &str,
    ) -> Result<Vec<Uuid>, AppError>;

    /// Oldest assets still waiting for thumbnails.
    async fn get_pending_thumbnails(&self, limit: i64) -> Result<Vec<Uuid>, AppError>;
}
