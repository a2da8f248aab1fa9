use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::SIMILARITY_DISTANCE_SCALE;

/// An existing asset that looks like the candidate image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub asset_id: Uuid,
    pub parent_id: Uuid,
    pub original_filename: String,
    pub similarity_percent: f64,
    pub distance: u32,
}

/// Similarity percentage for a Hamming distance: `100 - (distance / 10) * 100`,
/// clamped to [0, 100].
pub fn similarity_percentage(distance: u32) -> f64 {
    let percent = 100.0 - (f64::from(distance) / SIMILARITY_DISTANCE_SCALE) * 100.0;
    percent.clamp(0.0, 100.0)
}
