//! In-memory asset repository

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use stockyard_core::models::{Asset, NewAsset, ThumbnailPaths, ThumbnailStatus};
use stockyard_core::AppError;
use stockyard_db::AssetRepository;
use uuid::Uuid;

/// Repository double backed by a vector in insertion order.
///
/// Honors the same rules as the PostgreSQL implementation: a new asset is
/// primary only when the parent has none, thumbnail transitions are
/// validated, and the signature is set once.
#[derive(Clone, Default)]
pub struct MockAssetRepository {
    assets: Arc<Mutex<Vec<Asset>>>,
    fail_create: Arc<AtomicBool>,
    fail_count: Arc<AtomicBool>,
}

impl MockAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing `create` rules.
    pub fn insert(&self, asset: Asset) {
        self.assets.lock().unwrap().push(asset);
    }

    pub fn get(&self, id: Uuid) -> Option<Asset> {
        self.assets
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.assets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn primary_count(&self, parent_id: Uuid) -> usize {
        self.assets
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.parent_id == parent_id && a.is_primary)
            .count()
    }

    /// Make every following `create` fail with a database-style error.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make every following `count_by_parent` fail.
    pub fn fail_counts(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    fn update<F>(&self, id: Uuid, f: F) -> Result<Asset, AppError>
    where
        F: FnOnce(&mut Asset) -> Result<(), AppError>,
    {
        let mut assets = self.assets.lock().unwrap();
        let asset = assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", id)))?;
        f(asset)?;
        asset.updated_at = Utc::now();
        Ok(asset.clone())
    }

    fn transition<F>(&self, id: Uuid, next: ThumbnailStatus, apply: F) -> Result<Asset, AppError>
    where
        F: FnOnce(&mut Asset),
    {
        self.update(id, |asset| {
            asset.thumbnails.status.ensure_transition(next)?;
            asset.thumbnails.status = next;
            apply(asset);
            Ok(())
        })
    }

    fn sorted(mut assets: Vec<Asset>) -> Vec<Asset> {
        assets.sort_by_key(|a| (a.display_order, a.created_at));
        assets
    }
}

#[async_trait]
impl AssetRepository for MockAssetRepository {
    async fn create(&self, asset: NewAsset) -> Result<Asset, AppError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected create failure".to_string()));
        }

        let mut assets = self.assets.lock().unwrap();
        let has_primary = assets
            .iter()
            .any(|a| a.tenant_id == asset.tenant_id && a.parent_id == asset.parent_id && a.is_primary);

        let created = asset.into_asset(!has_primary, Utc::now());
        assets.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.get(id))
    }

    async fn get_by_parent(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.lock().unwrap();
        Ok(Self::sorted(
            assets
                .iter()
                .filter(|a| a.tenant_id == tenant_id && a.parent_id == parent_id)
                .cloned()
                .collect(),
        ))
    }

    async fn count_by_parent(&self, tenant_id: Uuid, parent_id: Uuid) -> Result<i64, AppError> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected count failure".to_string()));
        }
        let assets = self.assets.lock().unwrap();
        Ok(assets
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.parent_id == parent_id)
            .count() as i64)
    }

    async fn get_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.lock().unwrap();
        Ok(Self::sorted(
            assets
                .iter()
                .filter(|a| a.tenant_id == tenant_id && ids.contains(&a.id))
                .cloned()
                .collect(),
        ))
    }

    async fn update_display_order(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        display_order: i32,
    ) -> Result<(), AppError> {
        self.update(id, |asset| {
            if asset.tenant_id != tenant_id {
                return Err(AppError::NotFound(format!("Asset {} not found", id)));
            }
            asset.display_order = display_order;
            Ok(())
        })
        .map(|_| ())
    }

    async fn set_primary(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let mut assets = self.assets.lock().unwrap();
        let target_exists = assets
            .iter()
            .any(|a| a.id == id && a.tenant_id == tenant_id && a.parent_id == parent_id);
        if !target_exists {
            return Err(AppError::NotFound(format!(
                "Asset {} not found under parent {}",
                id, parent_id
            )));
        }

        for asset in assets
            .iter_mut()
            .filter(|a| a.tenant_id == tenant_id && a.parent_id == parent_id)
        {
            asset.is_primary = asset.id == id;
        }
        Ok(())
    }

    async fn ensure_primary(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let mut siblings: Vec<&mut Asset> = assets
            .iter_mut()
            .filter(|a| a.tenant_id == tenant_id && a.parent_id == parent_id)
            .collect();
        if siblings.iter().any(|a| a.is_primary) {
            return Ok(None);
        }

        siblings.sort_by_key(|a| (a.display_order, a.created_at));
        Ok(siblings.into_iter().next().map(|first| {
            first.is_primary = true;
            first.updated_at = Utc::now();
            first.id
        }))
    }

    async fn update_caption(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        caption: Option<String>,
    ) -> Result<Asset, AppError> {
        self.update(id, |asset| {
            if asset.tenant_id != tenant_id {
                return Err(AppError::NotFound(format!("Asset {} not found", id)));
            }
            asset.caption = caption;
            Ok(())
        })
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let before = assets.len();
        assets.retain(|a| !(a.id == id && a.tenant_id == tenant_id));
        Ok(assets.len() < before)
    }

    async fn bulk_delete(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<u64, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let before = assets.len();
        assets.retain(|a| !(a.tenant_id == tenant_id && ids.contains(&a.id)));
        Ok((before - assets.len()) as u64)
    }

    async fn get_with_signatures(&self, tenant_id: Uuid) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.lock().unwrap();
        Ok(assets
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.perceptual_hash.is_some())
            .cloned()
            .collect())
    }

    async fn get_with_signatures_for_parent(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.lock().unwrap();
        Ok(assets
            .iter()
            .filter(|a| {
                a.tenant_id == tenant_id && a.parent_id == parent_id && a.perceptual_hash.is_some()
            })
            .cloned()
            .collect())
    }

    async fn set_signature(&self, id: Uuid, signature: i64) -> Result<bool, AppError> {
        let mut written = false;
        self.update(id, |asset| {
            if asset.perceptual_hash.is_none() {
                asset.perceptual_hash = Some(signature);
                written = true;
            }
            Ok(())
        })?;
        Ok(written)
    }

    async fn mark_thumbnail_processing(&self, id: Uuid) -> Result<Asset, AppError> {
        self.transition(id, ThumbnailStatus::Processing, |asset| {
            asset.thumbnails.attempts += 1;
        })
    }

    async fn mark_thumbnail_complete(
        &self,
        id: Uuid,
        paths: &ThumbnailPaths,
    ) -> Result<Asset, AppError> {
        self.transition(id, ThumbnailStatus::Complete, |asset| {
            asset.thumbnails.small_path = Some(paths.small.clone());
            asset.thumbnails.medium_path = Some(paths.medium.clone());
            asset.thumbnails.large_path = Some(paths.large.clone());
            asset.thumbnails.last_error = None;
        })
    }

    async fn mark_thumbnail_failed(&self, id: Uuid, error: &str) -> Result<Asset, AppError> {
        self.transition(id, ThumbnailStatus::Failed, |asset| {
            asset.thumbnails.last_error = Some(error.to_string());
        })
    }

    async fn reset_thumbnail_for_retry(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Asset, AppError> {
        match self.get(id) {
            Some(asset) if asset.tenant_id == tenant_id => {
                self.transition(id, ThumbnailStatus::Pending, |_| {})
            }
            _ => Err(AppError::NotFound(format!("Asset {} not found", id))),
        }
    }

    async fn fail_stale_thumbnails(
        &self,
        stale_after: Duration,
        error: &str,
    ) -> Result<Vec<Uuid>, AppError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(stale_after)
                .map_err(|e| AppError::Internal(e.to_string()))?;
        let mut assets = self.assets.lock().unwrap();
        let mut failed = Vec::new();
        for asset in assets.iter_mut().filter(|a| {
            a.thumbnails.status == ThumbnailStatus::Processing && a.updated_at < cutoff
        }) {
            asset.thumbnails.status = ThumbnailStatus::Failed;
            asset.thumbnails.last_error = Some(error.to_string());
            asset.updated_at = Utc::now();
            failed.push(asset.id);
        }
        Ok(failed)
    }

    async fn get_pending_thumbnails(&self, limit: i64) -> Result<Vec<Uuid>, AppError> {
        let assets = self.assets.lock().unwrap();
        let mut pending: Vec<&Asset> = assets
            .iter()
            .filter(|a| a.thumbnails.status == ThumbnailStatus::Pending)
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|a| a.id)
            .collect())
    }
}
