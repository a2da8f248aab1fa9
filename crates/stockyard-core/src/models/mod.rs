pub mod asset;
pub mod duplicate;

pub use asset::*;
pub use duplicate::*;
