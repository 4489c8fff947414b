//! Core library for the PaveSafe road-defect dashboard.
//!
//! The modules fix the detection data contract the dashboard renders, provide
//! a stub detector behind a swappable trait, and aggregate the logged
//! detection statistics read from CSV.

pub mod detection;
pub mod math;
pub mod prelude;
pub mod stats;
pub mod telemetry;
pub mod upload;

pub use prelude::{DefectDetector, DetectionError, DetectionResult, DetectorConfig};
