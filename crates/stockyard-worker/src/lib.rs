//! Stockyard Worker
//!
//! Generates the derived thumbnails of uploaded assets out of band. The
//! [`ThumbnailJobQueue`] accepts asset ids from the upload pipeline and feeds a
//! bounded pool of [`ThumbnailWorker`] runs.

pub mod queue;
pub mod thumbnail;

pub use queue::{ThumbnailJob, ThumbnailJobQueue, ThumbnailQueueConfig};
pub use thumbnail::{ThumbnailOutcome, ThumbnailWorker};
