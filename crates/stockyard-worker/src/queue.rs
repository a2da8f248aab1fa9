use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use stockyard_core::{AppError, Config};
use stockyard_db::AssetRepository;
use stockyard_services::ThumbnailEnqueuer;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::thumbnail::{ThumbnailOutcome, ThumbnailWorker};

const STALE_PROCESSING_ERROR: &str = "Thumbnail generation did not finish; worker presumed stopped";

#[derive(Debug, Clone)]
pub enum ThumbnailJob {
    Generate { asset_id: Uuid },
}

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailQueueConfig {
    /// Bound of the job channel; `submit` fails once it is full.
    pub queue_size: usize,
    pub max_concurrent: usize,
    /// Age after which a `processing` asset is treated as abandoned.
    pub stale_after: Duration,
}

impl ThumbnailQueueConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            queue_size: config.thumbnail_queue_size,
            max_concurrent: config.thumbnail_max_concurrent,
            stale_after: Duration::from_secs(config.thumbnail_stale_after_seconds),
        }
    }
}

impl Default for ThumbnailQueueConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct ThumbnailJobQueue {
    tx: mpsc::Sender<ThumbnailJob>,
    stale_after: Duration,
}

impl ThumbnailJobQueue {
    /// Create the queue and spawn its worker pool on the current runtime.
    pub fn new(worker: ThumbnailWorker, config: ThumbnailQueueConfig) -> Self {
        let queue_size = config.queue_size.max(1);
        let max_concurrent = config.max_concurrent.max(1);
        let (tx, rx) = mpsc::channel(queue_size);

        let worker = Arc::new(worker);
        tokio::spawn(async move {
            Self::worker_pool(rx, worker, max_concurrent).await;
        });

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            "Thumbnail job queue initialized with bounded channel"
        );

        Self {
            tx,
            stale_after: config.stale_after,
        }
    }

    /// Submit without waiting. Fails when the queue is full or closed.
    #[tracing::instrument(skip(self), fields(job.type = "thumbnail"))]
    pub fn submit(&self, job: ThumbnailJob) -> Result<()> {
        match &job {
            ThumbnailJob::Generate { asset_id } => {
                tracing::debug!(asset_id = %asset_id, "Enqueuing thumbnail job");
            }
        }
        self.tx.try_send(job).map_err(|e| match &e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!("Thumbnail job queue is full, rejecting job");
                anyhow::anyhow!("Thumbnail job queue is full, please try again later")
            }
            _ => anyhow::anyhow!("Failed to submit thumbnail job: {}", e),
        })?;
        Ok(())
    }

    /// Submit a job, waiting for room if the queue is full.
    pub async fn submit_async(&self, job: ThumbnailJob) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to submit thumbnail job: {}", e))?;
        Ok(())
    }

    /// Re-enqueue up to `batch` assets still waiting for thumbnails, oldest
    /// first. Picks up jobs lost to a full queue or a stopped process.
    ///
    /// Assets stuck in `processing` past the stale window are marked failed
    /// first, so a crash mid-generation surfaces as a retryable failure.
    #[tracing::instrument(skip(self, repository))]
    pub async fn backfill(&self, repository: &dyn AssetRepository, batch: i64) -> Result<usize> {
        let abandoned = repository
            .fail_stale_thumbnails(self.stale_after, STALE_PROCESSING_ERROR)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to release stale thumbnail jobs: {}", e))?;
        if !abandoned.is_empty() {
            tracing::warn!(
                count = abandoned.len(),
                stale_after_secs = self.stale_after.as_secs(),
                "Marked abandoned thumbnail jobs as failed"
            );
        }

        if batch <= 0 {
            return Ok(0);
        }

        let pending = repository
            .get_pending_thumbnails(batch)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load pending assets: {}", e))?;

        for asset_id in &pending {
            self.submit_async(ThumbnailJob::Generate {
                asset_id: *asset_id,
            })
            .await?;
        }

        if !pending.is_empty() {
            tracing::info!(count = pending.len(), "Backfilled pending thumbnail jobs");
        }
        Ok(pending.len())
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<ThumbnailJob>,
        worker: Arc<ThumbnailWorker>,
        max_concurrent: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(job) = rx.recv().await {
            let permit = semaphore.clone().acquire_owned().await;
            let worker = worker.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = Self::process_job(job, &worker).await {
                    tracing::error!(error = %e, "Thumbnail job failed");
                }
            });
        }

        tracing::debug!("Thumbnail job channel closed, worker pool stopping");
    }

    #[tracing::instrument(skip(worker), fields(job.type = "thumbnail", job.status = tracing::field::Empty))]
    async fn process_job(job: ThumbnailJob, worker: &ThumbnailWorker) -> Result<()> {
        let start = std::time::Instant::now();
        let ThumbnailJob::Generate { asset_id } = job;

        let outcome = worker
            .process(asset_id)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let status = match &outcome {
            ThumbnailOutcome::Completed(_) => "success",
            ThumbnailOutcome::Failed(_) => "failed",
            ThumbnailOutcome::Skipped(_) => "skipped",
        };
        tracing::Span::current().record("job.status", status);
        tracing::info!(
            asset_id = %asset_id,
            duration_ms = start.elapsed().as_millis() as u64,
            status = status,
            "Thumbnail job finished"
        );
        Ok(())
    }
}

impl Clone for ThumbnailJobQueue {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            stale_after: self.stale_after,
        }
    }
}

impl ThumbnailEnqueuer for ThumbnailJobQueue {
    fn enqueue(&self, asset_id: Uuid) -> Result<(), AppError> {
        self.submit(ThumbnailJob::Generate { asset_id })
            .map_err(|e| AppError::Queue(e.to_string()))
    }
}
