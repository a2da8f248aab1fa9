//! Configuration module
//!
//! Environment-driven configuration for the repository, storage backend,
//! thumbnail worker and similarity search.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const THUMBNAIL_QUEUE_SIZE: usize = 1000;
const THUMBNAIL_MAX_CONCURRENT: usize = 2;
const THUMBNAIL_BACKFILL_BATCH: i64 = 100;
const THUMBNAIL_STALE_AFTER_SECS: u64 = 900;
const SIMILARITY_THRESHOLD: u32 = 10;

/// Log output format for the tracing subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub thumbnail_queue_size: usize,
    pub thumbnail_max_concurrent: usize,
    pub thumbnail_backfill_batch: i64,
    /// Seconds an asset may sit in `processing` before backfill marks it failed.
    pub thumbnail_stale_after_seconds: u64,
    pub similarity_threshold: u32,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: StorageBackend::Local,
            local_storage_path: "./data/assets".to_string(),
            thumbnail_queue_size: THUMBNAIL_QUEUE_SIZE,
            thumbnail_max_concurrent: THUMBNAIL_MAX_CONCURRENT,
            thumbnail_backfill_batch: THUMBNAIL_BACKFILL_BATCH,
            thumbnail_stale_after_seconds: THUMBNAIL_STALE_AFTER_SECS,
            similarity_threshold: SIMILARITY_THRESHOLD,
            log_format: LogFormat::Pretty,
        }
    }
}

/// Parse an optional env var, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(s) => s.parse::<StorageBackend>().map_err(|e| anyhow::anyhow!(e))?,
            Err(_) => StorageBackend::Local,
        };

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/assets".to_string()),
            thumbnail_queue_size: env_or("THUMBNAIL_QUEUE_SIZE", THUMBNAIL_QUEUE_SIZE).max(1),
            thumbnail_max_concurrent: env_or("THUMBNAIL_MAX_CONCURRENT", THUMBNAIL_MAX_CONCURRENT)
                .max(1),
            thumbnail_backfill_batch: env_or("THUMBNAIL_BACKFILL_BATCH", THUMBNAIL_BACKFILL_BATCH),
            thumbnail_stale_after_seconds: env_or(
                "THUMBNAIL_STALE_AFTER_SECS",
                THUMBNAIL_STALE_AFTER_SECS,
            ),
            similarity_threshold: env_or("SIMILARITY_THRESHOLD", SIMILARITY_THRESHOLD),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.similarity_threshold > 64 {
            return Err(anyhow::anyhow!(
                "SIMILARITY_THRESHOLD must be between 0 and 64 (signatures are 64 bits)"
            ));
        }
        if self.thumbnail_backfill_batch < 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_BACKFILL_BATCH must not be negative"));
        }
        if self.thumbnail_stale_after_seconds == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_STALE_AFTER_SECS must be positive"));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn require_database_url(&self) -> Result<&str, anyhow::Error> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
    }
}
