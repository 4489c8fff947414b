use anyhow::Context;
use pavecore::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: SocketAddr,
    pub stats_csv: PathBuf,
    pub assets_dir: PathBuf,
    pub stylesheet: PathBuf,
    pub temp_dir: PathBuf,
    pub max_upload_mb: u64,
    pub detector: DetectorConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            stats_csv: PathBuf::from("data/detection_stats.csv"),
            assets_dir: PathBuf::from("assets"),
            stylesheet: PathBuf::from("style.css"),
            temp_dir: PathBuf::from("temp_video_files"),
            max_upload_mb: 200,
            detector: DetectorConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading dashboard config {}", path_ref.display()))?;
        let config: DashboardConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing dashboard config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_point_at_repo_layout() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.stats_csv, PathBuf::from("data/detection_stats.csv"));
        assert_eq!(cfg.bind.port(), 8501);
        assert_eq!(cfg.max_upload_bytes(), 200 * 1024 * 1024);
    }

    #[test]
    fn config_load_reads_partial_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind: 0.0.0.0:9000\ntemp_dir: /tmp/pavesafe\ndetector:\n  seed: 7\n  video_latency_ms: 0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 9000);
        assert_eq!(cfg.temp_dir, PathBuf::from("/tmp/pavesafe"));
        assert_eq!(cfg.detector.seed, Some(7));
        assert_eq!(cfg.detector.video_latency_ms, 0);
        assert_eq!(cfg.detector.load_latency_ms, 2_000);
        assert_eq!(cfg.stylesheet, PathBuf::from("style.css"));
    }

    #[test]
    fn config_load_reports_bad_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"bind: [not, an, address]\n").unwrap();
        let err = DashboardConfig::load(temp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing dashboard config"));
    }
}
