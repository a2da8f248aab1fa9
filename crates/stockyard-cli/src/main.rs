//! Stockyard CLI: operator commands for the asset engine.
//!
//! Reads configuration from the environment (`DATABASE_URL`, `LOCAL_STORAGE_PATH`, ...).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use stockyard_core::Config;
use stockyard_db::{AssetRepository, PgAssetRepository};
use stockyard_processing::{DifferenceHasher, ImageProcessor};
use stockyard_services::{AssetService, NoopEnqueuer};
use stockyard_storage::create_storage;
use stockyard_worker::{ThumbnailJobQueue, ThumbnailQueueConfig, ThumbnailWorker};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "stockyard", about = "Stockyard asset engine operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Generate thumbnails for pending assets until interrupted
    Worker {
        /// Seconds between scans for pending assets
        #[arg(long, default_value = "30")]
        poll_interval: u64,
    },
    /// Look for stored assets resembling an image file
    Duplicates {
        /// Tenant UUID
        #[arg(long)]
        tenant: Uuid,
        /// Only compare against assets of this parent record
        #[arg(long)]
        parent: Option<Uuid>,
        /// Path to the candidate image
        file: PathBuf,
    },
    /// List the assets of a parent record in display order
    List {
        /// Tenant UUID
        #[arg(long)]
        tenant: Uuid,
        /// Parent record UUID
        #[arg(long)]
        parent: Uuid,
    },
    /// Put a failed asset back in line for thumbnail generation
    RetryThumbnails {
        /// Tenant UUID
        #[arg(long)]
        tenant: Uuid,
        /// Asset UUID
        asset: Uuid,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Engine wired to Postgres and the configured storage. Thumbnail jobs are
/// left `pending` for a `worker` process to pick up.
async fn asset_service(
    config: &Config,
    repository: Arc<dyn AssetRepository>,
) -> anyhow::Result<AssetService> {
    let storage = create_storage(config).await?;
    Ok(AssetService::new(
        repository,
        storage,
        Arc::new(ImageProcessor),
        Arc::new(NoopEnqueuer),
    )
    .with_hasher(Arc::new(DifferenceHasher::new(config.similarity_threshold))))
}

async fn run_worker(
    config: &Config,
    repository: Arc<dyn AssetRepository>,
    poll_interval: u64,
) -> anyhow::Result<()> {
    let storage = create_storage(config).await?;
    let worker = ThumbnailWorker::new(repository.clone(), storage, Arc::new(ImageProcessor))
        .with_hasher(Arc::new(DifferenceHasher::new(config.similarity_threshold)));
    let queue = ThumbnailJobQueue::new(worker, ThumbnailQueueConfig::from_config(config));

    let mut ticker = tokio::time::interval(Duration::from_secs(poll_interval.max(1)));
    tracing::info!(poll_interval_secs = poll_interval, "Thumbnail worker started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = queue
                    .backfill(repository.as_ref(), config.thumbnail_backfill_batch)
                    .await
                {
                    tracing::error!(error = %e, "Pending thumbnail scan failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, stopping thumbnail worker");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    stockyard_infra::init_telemetry(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let cli = Cli::parse();

    let pool = stockyard_db::connect(&config).await?;
    let repository: Arc<dyn AssetRepository> = Arc::new(PgAssetRepository::new(pool.clone()));

    match cli.command {
        Commands::Migrate => {
            stockyard_db::run_migrations(&pool).await?;
        }
        Commands::Worker { poll_interval } => {
            run_worker(&config, repository, poll_interval).await?;
        }
        Commands::Duplicates {
            tenant,
            parent,
            file,
        } => {
            let service = asset_service(&config, repository).await?;
            let signature = service
                .compute_signature(&file)
                .await?
                .context("Similarity hashing is not configured")?;
            let candidates = service.check_duplicates(tenant, signature, parent).await?;
            print_json(&candidates)?;
        }
        Commands::List { tenant, parent } => {
            let service = asset_service(&config, repository).await?;
            let assets = service.list_by_parent(parent, tenant).await?;
            print_json(&assets)?;
        }
        Commands::RetryThumbnails { tenant, asset } => {
            let service = asset_service(&config, repository).await?;
            let asset = service.retry_thumbnails(asset, tenant).await?;
            print_json(&asset)?;
        }
    }

    Ok(())
}
