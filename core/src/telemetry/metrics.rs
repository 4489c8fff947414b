use serde::Serialize;
use std::sync::Mutex;

/// Counters for analyses served since startup.
pub struct AnalysisMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub images_analyzed: usize,
    pub videos_analyzed: usize,
    pub failures: usize,
}

impl AnalysisMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_image(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.images_analyzed += 1;
        }
    }

    pub fn record_video(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.videos_analyzed += 1;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failures += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}
