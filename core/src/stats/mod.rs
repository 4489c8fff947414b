//! Aggregation over the CSV log of previously recorded detections.

pub mod loader;
pub mod record;
pub mod summary;

pub use loader::{load_detection_log, parse_detection_log, DetectionLog};
pub use record::{DetectionLogRecord, LogColumns};
pub use summary::{summarize, DefectCount, GeoPoint, MapView, NumericSummary, StatisticsSummary};

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum StatsError {
    #[error("statistics file not found at '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("statistics file '{}' is empty", .0.display())]
    Empty(PathBuf),
    #[error("reading statistics file '{}' failed: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("statistics data could not be parsed: {0}")]
    Parse(#[from] csv::Error),
    #[error("statistics data could not be parsed: expected {expected} fields in line {line}, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },
}
