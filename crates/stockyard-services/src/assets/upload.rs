//! Upload pipeline: validate → buffer → analyze → store → persist → enqueue

use std::path::Path;

use stockyard_core::constants::MAX_UPLOAD_BYTES;
use stockyard_core::models::{Asset, AssetMime, NewAsset};
use stockyard_core::validation::{sanitize_filename, validate_caption, validate_declared_upload};
use stockyard_core::AppError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::service::AssetService;
use super::types::UploadRequest;
use crate::cleanup::delete_object_best_effort;

impl AssetService {
    /// Ingest one image.
    ///
    /// Declared size and type are checked before the body is touched. The body
    /// is buffered to a scratch file and analyzed before anything is stored. If
    /// persistence fails after the original was written, the original is
    /// deleted again. Thumbnails are generated later; the returned asset is
    /// `pending`.
    #[tracing::instrument(
        skip(self, request, body),
        fields(
            tenant_id = %request.tenant_id,
            parent_id = %request.parent_id,
            declared_size = request.declared_size,
            asset_id = tracing::field::Empty
        )
    )]
    pub async fn upload<R>(&self, request: UploadRequest, body: R) -> Result<Asset, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mime = validate_declared_upload(request.declared_size, &request.content_type)?;
        validate_caption(request.caption.as_deref())?;
        let original_filename = sanitize_filename(&request.filename)?;

        let scratch = tempfile::Builder::new()
            .prefix("stockyard-upload-")
            .tempfile()?;
        let file_size = buffer_to_scratch(body, scratch.path()).await?;

        let (width, height) = self.analyze(scratch.path(), mime).await?;

        let asset_id = Uuid::new_v4();
        tracing::Span::current().record("asset_id", tracing::field::display(asset_id));

        let data = tokio::fs::read(scratch.path()).await?;
        drop(scratch);

        let stored_filename = format!("{}.{}", asset_id, mime.extension());
        let storage_path = self
            .storage
            .save(request.tenant_id, request.parent_id, &stored_filename, data)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to write original to storage");
                AppError::from(e)
            })?;

        let asset = match self
            .persist(
                asset_id,
                &request,
                original_filename,
                &storage_path,
                file_size,
                mime,
                (width, height),
            )
            .await
        {
            Ok(asset) => asset,
            Err(e) => {
                tracing::error!(error = %e, storage_key = %storage_path, "Failed to persist asset, removing original");
                delete_object_best_effort(&self.storage, &storage_path).await;
                return Err(e);
            }
        };

        self.enqueue_thumbnails(asset.id);

        tracing::info!(
            storage_key = %asset.storage_path,
            display_order = asset.display_order,
            is_primary = asset.is_primary,
            "Asset uploaded"
        );
        Ok(asset)
    }

    async fn analyze(&self, path: &Path, mime: AssetMime) -> Result<(i32, i32), AppError> {
        self.analyzer.validate(path, mime).await.map_err(|e| {
            tracing::debug!(error = %e, "Upload rejected by image validation");
            AppError::from(e)
        })?;

        let (width, height) = self.analyzer.dimensions(path).await?;
        let width = i32::try_from(width).ok().filter(|w| *w > 0);
        let height = i32::try_from(height).ok().filter(|h| *h > 0);
        match (width, height) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(AppError::ImageProcessing(
                "Image dimensions are out of range".to_string(),
            )),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        asset_id: Uuid,
        request: &UploadRequest,
        original_filename: String,
        storage_path: &str,
        file_size: u64,
        mime: AssetMime,
        (width, height): (i32, i32),
    ) -> Result<Asset, AppError> {
        let existing = self
            .repository
            .count_by_parent(request.tenant_id, request.parent_id)
            .await?;
        let display_order = i32::try_from(existing)
            .map_err(|_| AppError::Internal(format!("Asset count {} out of range", existing)))?;
        let file_size = i64::try_from(file_size)
            .map_err(|_| AppError::Internal(format!("File size {} out of range", file_size)))?;

        self.repository
            .create(NewAsset {
                id: asset_id,
                tenant_id: request.tenant_id,
                parent_id: request.parent_id,
                parent_kind: request.parent_kind,
                original_filename,
                storage_path: storage_path.to_string(),
                file_size,
                content_type: mime,
                width,
                height,
                display_order,
                caption: request.caption.clone(),
                uploaded_by: request.uploaded_by,
            })
            .await
    }
}

/// Copy the body to `path`, refusing more than the upload ceiling. Returns the byte count.
async fn buffer_to_scratch<R>(body: R, path: &Path) -> Result<u64, AppError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut limited = body.take(MAX_UPLOAD_BYTES + 1);
    let written = tokio::io::copy(&mut limited, &mut file).await?;
    file.flush().await?;

    if written > MAX_UPLOAD_BYTES {
        return Err(AppError::FileTooLarge {
            size: written,
            max: MAX_UPLOAD_BYTES,
        });
    }
    if written == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }
    Ok(written)
}
