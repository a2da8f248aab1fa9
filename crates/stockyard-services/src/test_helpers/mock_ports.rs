//! Scripted image analyzer, similarity hasher and recording enqueuer

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stockyard_core::models::AssetMime;
use stockyard_core::AppError;
use stockyard_processing::{
    DifferenceHasher, ImageAnalyzer, ProcessingError, SimilarityHasher, SimilarityMatch,
};
use uuid::Uuid;

use crate::enqueue::ThumbnailEnqueuer;

/// Analyzer that accepts any bytes and reports fixed dimensions.
///
/// Rendered thumbnails are the bytes `thumb-{max_edge}`.
#[derive(Clone)]
pub struct ScriptedAnalyzer {
    dimensions: (u32, u32),
    reject: Arc<AtomicBool>,
    fail_render: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAnalyzer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: (width, height),
            reject: Arc::new(AtomicBool::new(false)),
            fail_render: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make `validate` reject every file.
    pub fn reject_all(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn fail_renders(&self, fail: bool) {
        self.fail_render.store(fail, Ordering::SeqCst);
    }

    /// Total calls across all methods.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedAnalyzer {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

#[async_trait]
impl ImageAnalyzer for ScriptedAnalyzer {
    async fn validate(&self, _path: &Path, declared: AssetMime) -> Result<(), ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(ProcessingError::Decode(format!(
                "bytes are not a valid {}",
                declared
            )));
        }
        Ok(())
    }

    async fn dimensions(&self, _path: &Path) -> Result<(u32, u32), ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.dimensions)
    }

    async fn render_thumbnail(
        &self,
        _data: &[u8],
        max_edge: u32,
    ) -> Result<Vec<u8>, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_render.load(Ordering::SeqCst) {
            return Err(ProcessingError::Encode("injected render failure".to_string()));
        }
        Ok(format!("thumb-{}", max_edge).into_bytes())
    }
}

/// Hasher returning one fixed signature and comparing by Hamming distance.
#[derive(Clone)]
pub struct ScriptedHasher {
    signature: i64,
    threshold: u32,
    fail: Arc<AtomicBool>,
}

impl ScriptedHasher {
    pub fn new(signature: i64, threshold: u32) -> Self {
        Self {
            signature,
            threshold,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_hashing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SimilarityHasher for ScriptedHasher {
    async fn signature_from_bytes(&self, _data: &[u8]) -> Result<i64, ProcessingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProcessingError::Decode("injected hash failure".to_string()));
        }
        Ok(self.signature)
    }

    fn compare(&self, a: i64, b: i64) -> SimilarityMatch {
        let distance = DifferenceHasher::hamming_distance(a, b);
        SimilarityMatch {
            is_similar: distance <= self.threshold,
            distance,
        }
    }
}

/// Enqueuer that records every submitted asset id.
#[derive(Clone, Default)]
pub struct RecordingEnqueuer {
    jobs: Arc<Mutex<Vec<Uuid>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingEnqueuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<Uuid> {
        self.jobs.lock().unwrap().clone()
    }

    /// Refuse every job as a full queue would.
    pub fn fail_enqueues(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl ThumbnailEnqueuer for RecordingEnqueuer {
    fn enqueue(&self, asset_id: Uuid) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Queue("Thumbnail queue is full".to_string()));
        }
        self.jobs.lock().unwrap().push(asset_id);
        Ok(())
    }
}
