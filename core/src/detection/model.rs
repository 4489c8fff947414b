use crate::detection::stub::StubDetector;
use crate::prelude::{DefectDetector, DetectionError, DetectionResult, DetectorConfig};
use crate::telemetry::log::LogManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Loaded detection backend together with the config it was built from.
pub struct DetectionModel {
    detector: Box<dyn DefectDetector>,
    config: DetectorConfig,
}

impl DetectionModel {
    pub fn new(detector: Box<dyn DefectDetector>, config: DetectorConfig) -> Self {
        Self { detector, config }
    }

    pub fn detector(&self) -> &dyn DefectDetector {
        self.detector.as_ref()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.detector.name()
    }
}

/// Read-only handle shared by every request once the model is loaded.
pub type ModelHandle = Arc<DetectionModel>;

type DetectorFactory = Box<dyn Fn(&DetectorConfig) -> DetectionResult<Box<dyn DefectDetector>> + Send + Sync>;

/// Initialize-once holder for the model handle.
///
/// The first `load` runs the factory while holding the load lock, so
/// concurrent callers wait for that single load instead of starting their
/// own. A failed load leaves the cache empty and the next caller retries.
/// Readers of a published handle never touch the load lock.
pub struct ModelCache {
    ready: OnceLock<ModelHandle>,
    loading: Mutex<()>,
    config: DetectorConfig,
    factory: DetectorFactory,
    loads: AtomicUsize,
    logger: LogManager,
}

impl ModelCache {
    /// Cache backed by the stub detector.
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_factory(config, |config| {
            Ok(Box::new(StubDetector::new(config.clone())) as Box<dyn DefectDetector>)
        })
    }

    pub fn with_factory<F>(config: DetectorConfig, factory: F) -> Self
    where
        F: Fn(&DetectorConfig) -> DetectionResult<Box<dyn DefectDetector>> + Send + Sync + 'static,
    {
        Self {
            ready: OnceLock::new(),
            loading: Mutex::new(()),
            config,
            factory: Box::new(factory),
            loads: AtomicUsize::new(0),
            logger: LogManager::for_component("model-cache"),
        }
    }

    pub fn load(&self) -> DetectionResult<ModelHandle> {
        if let Some(handle) = self.ready.get() {
            return Ok(handle.clone());
        }
        let _guard = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = self.ready.get() {
            return Ok(handle.clone());
        }

        self.logger.record("loading detection model");
        if let Some(weights) = &self.config.weights {
            if !weights.is_file() {
                return Err(DetectionError::ModelLoad(format!(
                    "weights file {} not found",
                    weights.display()
                )));
            }
        }
        std::thread::sleep(self.config.load_latency());
        let detector = (self.factory)(&self.config)?;
        detector.warm_up()?;

        let handle = Arc::new(DetectionModel::new(detector, self.config.clone()));
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.logger
            .record(&format!("model loaded ({} backend)", handle.backend_name()));
        Ok(self.ready.get_or_init(|| handle).clone())
    }

    /// Number of loads that actually ran the factory.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Never waits on a load in progress.
    pub fn is_loaded(&self) -> bool {
        self.ready.get().is_some()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

static SHARED_CACHE: OnceLock<ModelCache> = OnceLock::new();

/// Process-wide cache. The config of the first caller wins.
pub fn shared_cache(config: &DetectorConfig) -> &'static ModelCache {
    SHARED_CACHE.get_or_init(|| ModelCache::new(config.clone()))
}
