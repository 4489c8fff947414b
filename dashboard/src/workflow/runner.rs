use crate::workflow::config::DashboardConfig;
use pavecore::detection::{
    detect_image, detect_video, encode_png, load_model, shared_cache, Detection, ModelCache,
    ModelHandle, VideoDetectionResult,
};
use pavecore::telemetry::{AnalysisMetrics, LogManager};
use pavecore::upload::{MediaKind, TempVideoFile, UploadError, UploadedFile};
use pavecore::DetectionError;
use std::sync::Arc;

/// Detections for an uploaded image, ready to render.
#[derive(Debug, Clone)]
pub struct ImageReport {
    pub detections: Vec<Detection>,
    pub potholes: usize,
    pub cracks: usize,
    pub processed_png: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub enum AnalysisReport {
    Image(ImageReport),
    Video(VideoDetectionResult),
}

/// Terminal failure of one analysis request, phrased for the user.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisFailure {
    #[error("Model could not be loaded. Cannot perform analysis.")]
    ModelUnavailable(#[source] DetectionError),
    #[error("Analysis failed: the file could not be decoded as an image.")]
    Decode(#[source] DetectionError),
    #[error("Analysis failed: {0}")]
    Detection(#[source] DetectionError),
    #[error("Error processing video: {0}")]
    Upload(#[from] UploadError),
    #[error("Unsupported file type for analysis ({0}).")]
    Unsupported(String),
    #[error("Analysis was aborted unexpectedly.")]
    Aborted,
}

impl AnalysisFailure {
    /// Unsupported types are shown as a warning rather than an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, AnalysisFailure::Unsupported(_))
    }
}

/// Runs one upload through the cached model.
#[derive(Clone)]
pub struct Runner {
    config: Arc<DashboardConfig>,
    cache: &'static ModelCache,
    metrics: Arc<AnalysisMetrics>,
    logger: LogManager,
}

impl Runner {
    /// Runner backed by the process-wide model cache.
    pub fn new(config: DashboardConfig) -> Self {
        let cache = shared_cache(&config.detector);
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: DashboardConfig, cache: &'static ModelCache) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            metrics: Arc::new(AnalysisMetrics::new()),
            logger: LogManager::for_component("runner"),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn metrics(&self) -> &AnalysisMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &'static ModelCache {
        self.cache
    }

    pub fn execute(&self, file: &UploadedFile) -> Result<AnalysisReport, AnalysisFailure> {
        self.logger.record(&format!(
            "analyzing {} ({}, {:.2} MB)",
            file.name,
            file.content_type,
            file.size_mb()
        ));
        let outcome = self.dispatch(file);
        match &outcome {
            Ok(AnalysisReport::Image(report)) => {
                self.metrics.record_image();
                self.logger.record(&format!(
                    "{} -> {} detections",
                    file.name,
                    report.detections.len()
                ));
            }
            Ok(AnalysisReport::Video(summary)) => {
                self.metrics.record_video();
                self.logger.record(&format!(
                    "{} -> {} potholes, {} cracks",
                    file.name, summary.total_potholes, summary.total_cracks
                ));
            }
            Err(failure) => {
                self.metrics.record_failure();
                self.logger
                    .warn(&format!("{} failed: {:?}", file.name, failure));
            }
        }
        outcome
    }

    fn dispatch(&self, file: &UploadedFile) -> Result<AnalysisReport, AnalysisFailure> {
        let kind = file.media_kind();
        if kind == MediaKind::Unsupported {
            return Err(AnalysisFailure::Unsupported(file.content_type.clone()));
        }
        let model = load_model(self.cache).map_err(AnalysisFailure::ModelUnavailable)?;
        match kind {
            MediaKind::Image => self.analyze_image(&model, file),
            MediaKind::Video => self.analyze_video(&model, file),
            MediaKind::Unsupported => Err(AnalysisFailure::Unsupported(file.content_type.clone())),
        }
    }

    fn analyze_image(
        &self,
        model: &ModelHandle,
        file: &UploadedFile,
    ) -> Result<AnalysisReport, AnalysisFailure> {
        let result = detect_image(model, &file.bytes).map_err(|err| match err {
            DetectionError::Decode(_) => AnalysisFailure::Decode(err),
            other => AnalysisFailure::Detection(other),
        })?;
        let processed_png = result.processed_image.as_ref().and_then(|image| {
            encode_png(image)
                .map_err(|err| self.logger.warn(&format!("encoding processed image: {err}")))
                .ok()
        });
        Ok(AnalysisReport::Image(ImageReport {
            potholes: result.pothole_count(),
            cracks: result.crack_count(),
            detections: result.detections,
            processed_png,
        }))
    }

    fn analyze_video(
        &self,
        model: &ModelHandle,
        file: &UploadedFile,
    ) -> Result<AnalysisReport, AnalysisFailure> {
        let extension = file.extension().unwrap_or_else(|| "bin".to_string());
        let temp = TempVideoFile::create(&self.config.temp_dir, &extension, &file.bytes)?;
        let result = detect_video(model, temp.path()).map_err(AnalysisFailure::Detection);
        if let Err(err) = temp.close() {
            self.logger.warn(&format!("removing temp video: {err}"));
        }
        result.map(AnalysisReport::Video)
    }
}
