use crate::detection::record::{BoundingBox, DefectLabel, Detection, VideoDetectionResult};
use crate::prelude::{DefectDetector, DetectionResult, DetectorConfig};
use crate::telemetry::log::LogManager;
use image::{DynamicImage, GenericImageView};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub const MAX_IMAGE_DETECTIONS: usize = 5;
pub const MIN_CONFIDENCE: f32 = 0.6;
pub const MAX_CONFIDENCE: f32 = 0.98;
pub const VIDEO_POTHOLE_RANGE: (u32, u32) = (5, 50);
pub const VIDEO_CRACK_RANGE: (u32, u32) = (10, 100);

const MIN_BOX_SIDE: u32 = 30;
const MAX_BOX_SIDE: u32 = 80;
const EDGE_MARGIN: u32 = 50;

/// Placeholder detector producing random results in the agreed schema.
pub struct StubDetector {
    rng: Mutex<StdRng>,
    config: DetectorConfig,
    logger: LogManager,
}

impl StubDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            config,
            logger: LogManager::for_component("stub-detector"),
        }
    }

    fn random_box(rng: &mut StdRng, width: u32, height: u32) -> DetectionResult<BoundingBox> {
        let (x1, x2) = random_span(rng, width);
        let (y1, y2) = random_span(rng, height);
        BoundingBox::new(x1, y1, x2, y2, width, height)
    }
}

/// Picks `[start, end)` of a random side length inside `0..=extent`.
fn random_span(rng: &mut StdRng, extent: u32) -> (u32, u32) {
    let side = rng.gen_range(MIN_BOX_SIDE..=MAX_BOX_SIDE).min(extent);
    let margin = if extent >= side + 2 * EDGE_MARGIN {
        EDGE_MARGIN
    } else {
        0
    };
    let start = rng.gen_range(margin..=extent - side - margin);
    (start, start + side)
}

impl DefectDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect_image(&self, image: &DynamicImage) -> DetectionResult<Vec<Detection>> {
        std::thread::sleep(self.config.image_latency());
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            self.logger.warn("empty image, skipping detection");
            return Ok(Vec::new());
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let count = rng.gen_range(0..=MAX_IMAGE_DETECTIONS);
        let mut detections = Vec::with_capacity(count);
        for _ in 0..count {
            let label = DefectLabel::ALL[rng.gen_range(0..DefectLabel::ALL.len())];
            let raw: f32 = rng.gen_range(MIN_CONFIDENCE..=MAX_CONFIDENCE);
            let confidence = ((raw * 100.0).round() / 100.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
            let bbox = Self::random_box(&mut rng, width, height)?;
            detections.push(Detection::new(label, confidence, bbox)?);
        }

        self.logger.record(&format!(
            "image {}x{} -> {} detections",
            width,
            height,
            detections.len()
        ));
        Ok(detections)
    }

    fn detect_video(&self, path: &Path) -> DetectionResult<VideoDetectionResult> {
        // Frames are not decoded yet; the path is only checked for the log.
        if !path.exists() {
            self.logger
                .warn(&format!("video {} does not exist", path.display()));
        }
        std::thread::sleep(self.config.video_latency());

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let result = VideoDetectionResult {
            total_potholes: rng.gen_range(VIDEO_POTHOLE_RANGE.0..=VIDEO_POTHOLE_RANGE.1),
            total_cracks: rng.gen_range(VIDEO_CRACK_RANGE.0..=VIDEO_CRACK_RANGE.1),
            processed_video_path: None,
        };
        self.logger.record(&format!(
            "video {} -> {} potholes, {} cracks",
            path.display(),
            result.total_potholes,
            result.total_cracks
        ));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::path::PathBuf;

    fn detector(seed: u64) -> StubDetector {
        StubDetector::new(DetectorConfig::instant().with_seed(seed))
    }

    #[test]
    fn image_detections_respect_count_confidence_and_bounds() {
        let sizes = [(640, 480), (200, 120), (31, 17), (1, 1)];
        for seed in 0..50 {
            let stub = detector(seed);
            for &(w, h) in &sizes {
                let image = DynamicImage::ImageRgb8(RgbImage::new(w, h));
                let detections = stub.detect_image(&image).unwrap();
                assert!(detections.len() <= MAX_IMAGE_DETECTIONS);
                for d in &detections {
                    assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&d.confidence));
                    assert!(d.bbox.x1 < d.bbox.x2 && d.bbox.y1 < d.bbox.y2);
                    assert!(d.bbox.x2 <= w && d.bbox.y2 <= h);
                }
            }
        }
    }

    #[test]
    fn large_images_keep_boxes_away_from_edges() {
        let stub = detector(7);
        let image = DynamicImage::ImageRgb8(RgbImage::new(1000, 800));
        for _ in 0..20 {
            for d in stub.detect_image(&image).unwrap() {
                assert!(d.bbox.x1 >= EDGE_MARGIN && d.bbox.y1 >= EDGE_MARGIN);
                assert!(d.bbox.x2 <= 1000 - EDGE_MARGIN && d.bbox.y2 <= 800 - EDGE_MARGIN);
            }
        }
    }

    #[test]
    fn zero_sized_image_has_no_detections() {
        let stub = detector(1);
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(stub.detect_image(&image).unwrap().is_empty());
    }

    #[test]
    fn video_counts_stay_in_range_for_missing_paths() {
        let stub = detector(3);
        for _ in 0..100 {
            let result = stub
                .detect_video(&PathBuf::from("/nonexistent/clip.mp4"))
                .unwrap();
            assert!((5..=50).contains(&result.total_potholes));
            assert!((10..=100).contains(&result.total_cracks));
            assert!(result.processed_video_path.is_none());
        }
    }

    #[test]
    fn seeded_stubs_are_reproducible() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(320, 240));
        let first = detector(42).detect_image(&image).unwrap();
        let second = detector(42).detect_image(&image).unwrap();
        assert_eq!(first, second);
    }
}
