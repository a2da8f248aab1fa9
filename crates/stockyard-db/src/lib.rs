//! Stockyard DB Library
//!
//! Persistence for asset records and their derived-thumbnail state.

pub mod db;

pub use db::asset::{AssetRepository, PgAssetRepository};
pub use db::pool::{connect, run_migrations};
pub use db::transaction::TransactionGuard;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
