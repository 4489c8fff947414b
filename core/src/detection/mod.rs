//! Detection contract and the operations the dashboard calls.

pub mod annotate;
pub mod model;
pub mod record;
pub mod stub;

pub use annotate::{annotate, encode_png};
pub use model::{shared_cache, DetectionModel, ModelCache, ModelHandle};
pub use record::{BoundingBox, DefectLabel, Detection, ImageDetectionResult, VideoDetectionResult};
pub use stub::StubDetector;

use crate::prelude::DetectionResult;
use std::path::Path;

/// Returns the cached model handle, loading it on first use.
pub fn load_model(cache: &ModelCache) -> DetectionResult<ModelHandle> {
    cache.load()
}

/// Decodes `image_bytes` and runs the model on it.
///
/// Bytes that are not a supported image yield `DetectionError::Decode`.
pub fn detect_image(model: &ModelHandle, image_bytes: &[u8]) -> DetectionResult<ImageDetectionResult> {
    let image = image::load_from_memory(image_bytes)?;
    let detections = model.detector().detect_image(&image)?;
    let processed_image = if model.config().annotate {
        annotate(&image, &detections)
    } else {
        image
    };
    Ok(ImageDetectionResult {
        detections,
        processed_image: Some(processed_image),
    })
}

/// Runs the model over the video stored at `video_path`.
pub fn detect_video(model: &ModelHandle, video_path: &Path) -> DetectionResult<VideoDetectionResult> {
    model.detector().detect_video(video_path)
}
