use crate::prelude::{DetectionError, DetectionResult};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Road-surface defect category reported by the detector.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DefectLabel {
    Pothole,
    Crack,
    LongitudinalCrack,
    TransverseCrack,
}

impl DefectLabel {
    pub const ALL: [DefectLabel; 4] = [
        DefectLabel::Pothole,
        DefectLabel::Crack,
        DefectLabel::LongitudinalCrack,
        DefectLabel::TransverseCrack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefectLabel::Pothole => "pothole",
            DefectLabel::Crack => "crack",
            DefectLabel::LongitudinalCrack => "longitudinal_crack",
            DefectLabel::TransverseCrack => "transverse_crack",
        }
    }

    pub fn is_pothole(&self) -> bool {
        self.as_str().contains("pothole")
    }

    pub fn is_crack(&self) -> bool {
        self.as_str().contains("crack")
    }
}

impl fmt::Display for DefectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel-space box with `x1 < x2`, `y1 < y2`, kept inside its image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Validates the corners against an image of `width` x `height`.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32, width: u32, height: u32) -> DetectionResult<Self> {
        if x1 >= x2 || y1 >= y2 {
            return Err(DetectionError::InvalidDetection(format!(
                "degenerate box ({x1}, {y1}, {x2}, {y2})"
            )));
        }
        if x2 > width || y2 > height {
            return Err(DetectionError::InvalidDetection(format!(
                "box ({x1}, {y1}, {x2}, {y2}) exceeds {width}x{height} image"
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Clamps raw corners to the image, returning `None` when nothing is left.
    pub fn clipped(x1: i64, y1: i64, x2: i64, y2: i64, width: u32, height: u32) -> Option<Self> {
        let clamp_x = |v: i64| v.clamp(0, width as i64) as u32;
        let clamp_y = |v: i64| v.clamp(0, height as i64) as u32;
        Self::new(clamp_x(x1), clamp_y(y1), clamp_x(x2), clamp_y(y2), width, height).ok()
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn as_array(&self) -> [u32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One defect instance found in an image or frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub label: DefectLabel,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: DefectLabel, confidence: f32, bbox: BoundingBox) -> DetectionResult<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DetectionError::InvalidDetection(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self {
            label,
            confidence,
            bbox,
        })
    }
}

/// Detections for one image plus the (optionally annotated) image copy.
#[derive(Debug, Clone)]
pub struct ImageDetectionResult {
    pub detections: Vec<Detection>,
    pub processed_image: Option<DynamicImage>,
}

impl ImageDetectionResult {
    pub fn pothole_count(&self) -> usize {
        self.detections.iter().filter(|d| d.label.is_pothole()).count()
    }

    pub fn crack_count(&self) -> usize {
        self.detections.iter().filter(|d| d.label.is_crack()).count()
    }
}

/// Aggregate counts over a whole video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoDetectionResult {
    pub total_potholes: u32,
    pub total_cracks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_video_path: Option<PathBuf>,
}
