use crate::detection::record::{Detection, VideoDetectionResult};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shared configuration for the detector and its model cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Fixed RNG seed for the stub; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub load_latency_ms: u64,
    pub image_latency_ms: u64,
    pub video_latency_ms: u64,
    /// Draw detection boxes onto the processed image copy.
    pub annotate: bool,
    /// Weights file a real backend would load. Must exist when set.
    pub weights: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            load_latency_ms: 2_000,
            image_latency_ms: 1_500,
            video_latency_ms: 5_000,
            annotate: true,
            weights: None,
        }
    }
}

impl DetectorConfig {
    /// Config with every simulated delay disabled.
    pub fn instant() -> Self {
        Self {
            load_latency_ms: 0,
            image_latency_ms: 0,
            video_latency_ms: 0,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn load_latency(&self) -> Duration {
        Duration::from_millis(self.load_latency_ms)
    }

    pub fn image_latency(&self) -> Duration {
        Duration::from_millis(self.image_latency_ms)
    }

    pub fn video_latency(&self) -> Duration {
        Duration::from_millis(self.video_latency_ms)
    }
}

/// Errors raised while loading the model or running detection.
#[derive(thiserror::Error, Debug)]
pub enum DetectionError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("model could not be loaded: {0}")]
    ModelLoad(String),
    #[error("invalid detection: {0}")]
    InvalidDetection(String),
    #[error("video analysis failed: {0}")]
    Video(String),
}

pub type DetectionResult<T> = Result<T, DetectionError>;

/// Backend that turns decoded media into detections.
///
/// The stub implements this today; a real inference backend replaces it
/// without changes to the model cache, runner or pages.
pub trait DefectDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run detection on one decoded image. Boxes must lie inside the image.
    fn detect_image(&self, image: &DynamicImage) -> DetectionResult<Vec<Detection>>;

    /// Aggregate detections over the video stored at `path`.
    fn detect_video(&self, path: &Path) -> DetectionResult<VideoDetectionResult>;

    /// Optional warm-up hook, run once while the model is being loaded.
    fn warm_up(&self) -> DetectionResult<()> {
        Ok(())
    }
}
