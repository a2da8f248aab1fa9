//! Stockyard Infrastructure Library
//!
//! Process-wide plumbing shared by the stockyard binaries. Currently only
//! tracing subscriber setup.

pub mod telemetry;

pub use telemetry::init_telemetry;
