pub mod postgres;
pub mod repository;

pub use postgres::PgAssetRepository;
pub use repository::AssetRepository;
