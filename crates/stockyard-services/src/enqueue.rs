//! Hand-off from the upload pipeline to thumbnail generation.

use stockyard_core::AppError;
use uuid::Uuid;

/// Fire-and-forget submission of a thumbnail job for one asset.
///
/// Must not block: an implementation that cannot accept the job right now
/// returns an error and the asset stays `pending` until it is backfilled.
pub trait ThumbnailEnqueuer: Send + Sync {
    fn enqueue(&self, asset_id: Uuid) -> Result<(), AppError>;
}

/// Enqueuer that drops every job. Used when no worker runs in-process; the
/// worker's startup backfill picks the pending assets up later.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnqueuer;

impl ThumbnailEnqueuer for NoopEnqueuer {
    fn enqueue(&self, asset_id: Uuid) -> Result<(), AppError> {
        tracing::debug!(asset_id = %asset_id, "No thumbnail queue configured, job left pending");
        Ok(())
    }
}
