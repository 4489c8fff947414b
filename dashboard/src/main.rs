use anyhow::Context;
use clap::Parser;
use pavecore::stats::{load_detection_log, summarize, MapView};
use pavecore::upload::UploadedFile;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use web::Dashboard;
use workflow::config::DashboardConfig;
use workflow::runner::{AnalysisReport, Runner};

mod web;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "PaveSafe road-defect dashboard")]
struct Args {
    /// Load the dashboard config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to serve the dashboard on
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Detection log CSV read by the statistics page
    #[arg(long)]
    stats_csv: Option<PathBuf>,
    /// Seed the stub detector for reproducible results
    #[arg(long)]
    seed: Option<u64>,
    /// Analyze one image or video offline and print the result
    #[arg(long)]
    analyze: Option<PathBuf>,
    /// Print the detection log summary and exit
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Serve the dashboard (default when no offline mode is given)
    #[arg(long, default_value_t = false)]
    serve: bool,
}

impl Args {
    fn dashboard_config(&self) -> anyhow::Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::load(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(path) = &self.stats_csv {
            config.stats_csv = path.clone();
        }
        if self.seed.is_some() {
            config.detector.seed = self.seed;
        }
        Ok(config)
    }
}

fn analyze_offline(runner: &Runner, path: &Path) -> anyhow::Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = UploadedFile::accept(name, None, bytes)?;

    let report = match runner.execute(&file) {
        Ok(AnalysisReport::Image(report)) => {
            for detection in &report.detections {
                println!(
                    "{:<20} {:.2} {}",
                    detection.label, detection.confidence, detection.bbox
                );
            }
            format!("{} detections={}", file.name, report.detections.len())
        }
        Ok(AnalysisReport::Video(summary)) => format!(
            "{} potholes={} cracks={}",
            file.name, summary.total_potholes, summary.total_cracks
        ),
        Err(failure) => format!("{} failed: {}", file.name, failure),
    };
    println!("Offline analysis -> {report}");

    let report_path = PathBuf::from("reports/offline_analysis.log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening {}", report_path.display()))?;
    writeln!(log_file, "{report}")?;
    Ok(())
}

fn print_statistics(config: &DashboardConfig) -> anyhow::Result<()> {
    let log = load_detection_log(&config.stats_csv)?;
    let summary = summarize(&log);
    println!("Total detections logged: {}", summary.total_rows);
    println!("Potholes logged: {}", summary.potholes);
    println!("Cracks logged: {}", summary.cracks);
    for numeric in &summary.numeric {
        println!(
            "{:<10} count={} mean={:.4} min={:.4} max={:.4}",
            numeric.column, numeric.count, numeric.mean, numeric.min, numeric.max
        );
    }
    match &summary.map {
        MapView::Points(points) => println!("Locations with coordinates: {}", points.len()),
        MapView::NoValidCoordinates => println!("No valid coordinates in the log."),
        MapView::MissingCoordinates => println!("Coordinate columns missing or empty."),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.dashboard_config()?;
    let runner = Runner::new(config.clone());

    if let Some(path) = &args.analyze {
        analyze_offline(&runner, path)?;
    }
    if args.stats {
        print_statistics(&config)?;
    }
    if args.serve || (args.analyze.is_none() && !args.stats) {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for the dashboard")?;
        let dashboard = Arc::new(Dashboard::new(runner));
        runtime.block_on(async move {
            let filter = web::routes(dashboard);
            let (addr, server) = warp::serve(filter)
                .try_bind_with_graceful_shutdown(config.bind, async {
                    if let Err(err) = signal::ctrl_c().await {
                        log::error!("awaiting Ctrl+C failed: {err}");
                    }
                })
                .with_context(|| format!("binding {}", config.bind))?;
            log::info!("PaveSafe dashboard listening on http://{addr} (Ctrl+C to stop)");
            server.await;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
