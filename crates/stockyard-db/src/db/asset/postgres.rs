use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::time::Duration;
use stockyard_core::models::{Asset, AssetRow, NewAsset, ThumbnailPaths, ThumbnailStatus};
use stockyard_core::AppError;
use uuid::Uuid;

use super::repository::AssetRepository;
use crate::db::transaction::TransactionGuard;

fn rows_to_assets(rows: Vec<AssetRow>) -> Result<Vec<Asset>, AppError> {
    rows.into_iter().map(Asset::try_from).collect()
}

/// PostgreSQL asset repository
#[derive(Clone)]
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded status update matched no row.
    async fn transition_error(&self, id: Uuid, to: ThumbnailStatus) -> AppError {
        match self.get_by_id(id).await {
            Ok(Some(asset)) => AppError::InvalidStateTransition {
                from: asset.thumbnails.status.to_string(),
                to: to.to_string(),
            },
            Ok(None) => AppError::NotFound(format!("Asset {} not found", id)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl AssetRepository for PgAssetRepository {
    #[tracing::instrument(skip(self, asset), fields(db.table = "assets", db.operation = "insert", asset_id = %asset.id))]
    async fn create(&self, asset: NewAsset) -> Result<Asset, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        tx.lock_parent(asset.parent_id).await?;

        let row = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            INSERT INTO assets (
                id, tenant_id, parent_id, parent_kind, original_filename, storage_path,
                file_size, content_type, width, height, display_order, is_primary,
                caption, uploaded_by, thumbnail_status
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                NOT EXISTS (
                    SELECT 1 FROM assets WHERE tenant_id = $2 AND parent_id = $3 AND is_primary
                ),
                $12, $13, 'pending'
            )
            RETURNING *
            "#,
        )
        .bind(asset.id)
        .bind(asset.tenant_id)
        .bind(asset.parent_id)
        .bind(asset.parent_kind)
        .bind(&asset.original_filename)
        .bind(&asset.storage_path)
        .bind(asset.file_size)
        .bind(asset.content_type.as_str())
        .bind(asset.width)
        .bind(asset.height)
        .bind(asset.display_order)
        .bind(&asset.caption)
        .bind(asset.uploaded_by)
        .fetch_one(&mut **tx)
        .await?;

        tx.commit().await?;
        Asset::try_from(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        let row = sqlx::query_as::<Postgres, AssetRow>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Asset::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn get_by_parent(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Asset>, AppError> {
        let rows = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            SELECT * FROM assets
            WHERE tenant_id = $1 AND parent_id = $2
            ORDER BY display_order ASC, created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        rows_to_assets(rows)
    }

    async fn count_by_parent(&self, tenant_id: Uuid, parent_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assets WHERE tenant_id = $1 AND parent_id = $2",
        )
        .bind(tenant_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "assets", db.operation = "select", count = ids.len()))]
    async fn get_by_ids(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<Asset>, AppError> {
        let rows = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            SELECT * FROM assets
            WHERE tenant_id = $1 AND id = ANY($2)
            ORDER BY display_order ASC, created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows_to_assets(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn update_display_order(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        display_order: i32,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET display_order = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(display_order)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Asset {} not found", id)));
        }
        Ok(())
    }

    /// Clear-then-set under the parent lock. The partial unique index on
    /// `(tenant_id, parent_id) WHERE is_primary` rejects any second primary.
    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn set_primary(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        tx.lock_parent(parent_id).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM assets WHERE id = $3 AND tenant_id = $1 AND parent_id = $2)",
        )
        .bind(tenant_id)
        .bind(parent_id)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        if !exists {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Asset {} not found under parent {}",
                id, parent_id
            )));
        }

        sqlx::query(
            r#"
            UPDATE assets SET is_primary = FALSE, updated_at = NOW()
            WHERE tenant_id = $1 AND parent_id = $2 AND is_primary AND id <> $3
            "#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE assets SET is_primary = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT is_primary
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn ensure_primary(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        tx.lock_parent(parent_id).await?;

        let promoted: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE assets SET is_primary = TRUE, updated_at = NOW()
            WHERE id = (
                SELECT id FROM assets
                WHERE tenant_id = $1 AND parent_id = $2
                ORDER BY display_order ASC, created_at ASC
                LIMIT 1
            )
            AND NOT EXISTS (
                SELECT 1 FROM assets WHERE tenant_id = $1 AND parent_id = $2 AND is_primary
            )
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .fetch_optional(&mut **tx)
        .await?;

        tx.commit().await?;
        Ok(promoted)
    }

    #[tracing::instrument(skip(self, caption), fields(db.table = "assets", db.operation = "update"))]
    async fn update_caption(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        caption: Option<String>,
    ) -> Result<Asset, AppError> {
        let row = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets SET caption = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(caption)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", id)))?;

        Asset::try_from(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM assets WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "assets", db.operation = "delete", count = ids.len()))]
    async fn bulk_delete(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM assets WHERE tenant_id = $1 AND id = ANY($2)")
            .bind(tenant_id)
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn get_with_signatures(&self, tenant_id: Uuid) -> Result<Vec<Asset>, AppError> {
        let rows = sqlx::query_as::<Postgres, AssetRow>(
            "SELECT * FROM assets WHERE tenant_id = $1 AND perceptual_hash IS NOT NULL",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows_to_assets(rows)
    }

    async fn get_with_signatures_for_parent(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Asset>, AppError> {
        let rows = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            SELECT * FROM assets
            WHERE tenant_id = $1 AND parent_id = $2 AND perceptual_hash IS NOT NULL
            "#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        rows_to_assets(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn set_signature(&self, id: Uuid, signature: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET perceptual_hash = $2, updated_at = NOW()
            WHERE id = $1 AND perceptual_hash IS NULL
            "#,
        )
        .bind(id)
        .bind(signature)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn mark_thumbnail_processing(&self, id: Uuid) -> Result<Asset, AppError> {
        let row = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets
            SET thumbnail_status = 'processing',
                thumbnail_attempts = thumbnail_attempts + 1,
                updated_at = NOW()
            WHERE id = $1 AND thumbnail_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Asset::try_from(row),
            None => Err(self.transition_error(id, ThumbnailStatus::Processing).await),
        }
    }

    #[tracing::instrument(skip(self, paths), fields(db.table = "assets", db.operation = "update"))]
    async fn mark_thumbnail_complete(
        &self,
        id: Uuid,
        paths: &ThumbnailPaths,
    ) -> Result<Asset, AppError> {
        let row = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets
            SET thumbnail_status = 'complete',
                thumbnail_small_path = $2,
                thumbnail_medium_path = $3,
                thumbnail_large_path = $4,
                thumbnail_error = NULL,
                updated_at = NOW()
            WHERE id = $1 AND thumbnail_status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&paths.small)
        .bind(&paths.medium)
        .bind(&paths.large)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Asset::try_from(row),
            None => Err(self.transition_error(id, ThumbnailStatus::Complete).await),
        }
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "assets", db.operation = "update"))]
    async fn mark_thumbnail_failed(&self, id: Uuid, error: &str) -> Result<Asset, AppError> {
        let row = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets
            SET thumbnail_status = 'failed', thumbnail_error = $2, updated_at = NOW()
            WHERE id = $1 AND thumbnail_status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Asset::try_from(row),
            None => Err(self.transition_error(id, ThumbnailStatus::Failed).await),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn reset_thumbnail_for_retry(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Asset, AppError> {
        let row = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets SET thumbnail_status = 'pending', updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND thumbnail_status = 'failed'
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Asset::try_from(row),
            None => Err(self.transition_error(id, ThumbnailStatus::Pending).await),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update"))]
    async fn fail_stale_thumbnails(
        &self,
        stale_after: Duration,
        error: &str,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE assets
            SET thumbnail_status = 'failed', thumbnail_error = $2, updated_at = NOW()
            WHERE thumbnail_status = 'processing'
              AND updated_at < NOW() - make_interval(secs => $1)
            RETURNING id
            "#,
        )
        .bind(stale_after.as_secs_f64())
        .bind(error)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn get_pending_thumbnails(&self, limit: i64) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM assets
            WHERE thumbnail_status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
