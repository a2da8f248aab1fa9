//! 64-bit difference hash (dHash).
//!
//! The image is reduced to a 9x8 grayscale grid; each bit records whether a
//! pixel is brighter than its right-hand neighbour. Visually similar images
//! produce signatures with a small Hamming distance.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::traits::{SimilarityHasher, SimilarityMatch};
use crate::ProcessingError;

const GRID_WIDTH: u32 = 9;
const GRID_HEIGHT: u32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct DifferenceHasher {
    threshold: u32,
}

impl DifferenceHasher {
    /// `threshold` is the largest Hamming distance still reported as similar.
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn hash_image(img: &DynamicImage) -> u64 {
        let grid = img
            .resize_exact(GRID_WIDTH, GRID_HEIGHT, FilterType::Triangle)
            .to_luma8();

        let mut hash = 0u64;
        for y in 0..GRID_HEIGHT {
            for x in 0..GRID_WIDTH - 1 {
                let left = grid.get_pixel(x, y)[0];
                let right = grid.get_pixel(x + 1, y)[0];
                hash <<= 1;
                if left > right {
                    hash |= 1;
                }
            }
        }
        hash
    }

    pub fn hamming_distance(a: i64, b: i64) -> u32 {
        (a ^ b).count_ones()
    }
}

#[async_trait]
impl SimilarityHasher for DifferenceHasher {
    async fn signature_from_bytes(&self, data: &[u8]) -> Result<i64, ProcessingError> {
        let data = data.to_vec();
        let hash = tokio::task::spawn_blocking(move || -> Result<u64, ProcessingError> {
            let img = image::load_from_memory(&data)?;
            Ok(Self::hash_image(&img))
        })
        .await??;

        // Stored as a signed 64-bit column; the bit pattern is what matters.
        Ok(hash as i64)
    }

    fn compare(&self, a: i64, b: i64) -> SimilarityMatch {
        let distance = Self::hamming_distance(a, b);
        SimilarityMatch {
            is_similar: distance <= self.threshold,
            distance,
        }
    }
}
