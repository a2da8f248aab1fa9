pub mod asset;
pub mod pool;
pub mod transaction;
