use crate::web::assets::PageAssets;
use crate::web::sessions::DashboardSession;
use crate::workflow::runner::{AnalysisFailure, AnalysisReport, ImageReport};
use pavecore::detection::VideoDetectionResult;
use pavecore::stats::{DetectionLog, MapView, NumericSummary, StatisticsSummary, StatsError};
use pavecore::upload::{MediaKind, SessionState, UploadedFile, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use std::path::Path;

const FOOTER: &str = "© 2025 PaveSafe.AI | Developed by PCCOE Students";
const MAP_POINT_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn class(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// One-off message shown above the page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn banner(level: Level, text: &str) -> String {
    format!(
        "<div class=\"banner {}\">{}</div>\n",
        level.class(),
        escape_html(text)
    )
}

fn metric(label: &str, value: impl std::fmt::Display) -> String {
    format!(
        "<div class=\"metric\"><span class=\"metric-label\">{}</span><span class=\"metric-value\">{}</span></div>\n",
        escape_html(label),
        escape_html(&value.to_string())
    )
}

fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table>\n<thead><tr>");
    for header in headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for index in 0..headers.len() {
            let cell = row.get(index).map(String::as_str).unwrap_or("");
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

/// Wraps `body` in the shared layout: stylesheet, logos, navigation, footer.
///
/// Asset problems are only reported on the main page; other pages stay quiet.
pub fn layout(title: &str, assets: &PageAssets, report_assets: bool, body: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{} | PaveSafe.AI</title>\n", escape_html(title)));
    if assets.logos.contains(&"pavesafe_logo.jpg") {
        html.push_str("<link rel=\"icon\" href=\"/assets/pavesafe_logo.jpg\">\n");
    }
    if let Some(css) = &assets.stylesheet {
        html.push_str(&format!("<style>\n{css}\n</style>\n"));
    }
    html.push_str("</head>\n<body>\n<nav><a href=\"/\">Upload &amp; Analyze</a> <a href=\"/statistics\">Statistics</a> <a href=\"/about\">Project Info</a></nav>\n");

    if report_assets {
        if let Some(error) = &assets.stylesheet_error {
            html.push_str(&banner(Level::Error, error));
        }
    }
    html.push_str("<div class=\"logo-container\">");
    for logo in &assets.logos {
        html.push_str(&format!(
            "<img src=\"/assets/{logo}\" alt=\"{logo}\" width=\"120\">"
        ));
    }
    html.push_str("</div>\n");
    if report_assets && !assets.missing_logos.is_empty() {
        html.push_str(&banner(
            Level::Error,
            &format!(
                "Logo file(s) not found in 'assets' folder: {}.",
                assets.missing_logos.join(", ")
            ),
        ));
    }

    html.push_str("<main>\n");
    html.push_str(body);
    html.push_str("</main>\n<hr>\n");
    html.push_str(&format!("<footer><small>{FOOTER}</small></footer>\n</body>\n</html>\n"));
    html
}

fn upload_form(has_file: bool) -> String {
    let accept: Vec<String> = IMAGE_EXTENSIONS
        .iter()
        .chain(VIDEO_EXTENSIONS.iter())
        .map(|ext| format!(".{ext}"))
        .collect();
    let mut html = format!(
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n\
         <label>Choose an image or video file <input type=\"file\" name=\"file\" accept=\"{}\"></label>\n\
         <button type=\"submit\" name=\"action\" value=\"preview\">Upload</button>\n\
         <button type=\"submit\" name=\"action\" value=\"analyze\">Upload &amp; Analyze</button>\n\
         </form>\n",
        accept.join(",")
    );
    if has_file {
        html.push_str(
            "<form method=\"post\" action=\"/analyze\"><button type=\"submit\">Analyze File</button></form>\n\
             <form method=\"post\" action=\"/reset\"><button type=\"submit\">Clear</button></form>\n",
        );
    }
    html
}

fn file_details(file: &UploadedFile) -> String {
    format!(
        "<h3>Uploaded File Preview &amp; Analysis</h3>\n<ul class=\"file-details\">\
         <li><b>File Name:</b> {}</li><li><b>File Type:</b> {}</li><li><b>File Size:</b> {:.2} MB</li></ul>\n",
        escape_html(&file.name),
        escape_html(&file.content_type),
        file.size_mb()
    )
}

fn preview(file: &UploadedFile) -> String {
    match file.media_kind() {
        MediaKind::Image => {
            "<img class=\"preview\" src=\"/media/upload\" alt=\"Uploaded Image\">\n".to_string()
        }
        MediaKind::Video => format!(
            "<video class=\"preview\" controls src=\"/media/upload\" type=\"{}\"></video>\n",
            escape_html(&file.content_type)
        ),
        MediaKind::Unsupported => String::new(),
    }
}

fn image_results(report: &ImageReport) -> String {
    let mut html = banner(Level::Success, "Analysis Complete!");
    html.push_str("<h4>Detection Results:</h4>\n");
    if report.detections.is_empty() {
        html.push_str(&banner(Level::Info, "No defects detected in the image."));
        return html;
    }
    html.push_str(&metric("Potholes Detected", report.potholes));
    html.push_str(&metric("Cracks Detected", report.cracks));
    let headers = ["label", "confidence", "box"].map(String::from);
    let rows: Vec<Vec<String>> = report
        .detections
        .iter()
        .map(|d| {
            vec![
                d.label.to_string(),
                format!("{:.2}", d.confidence),
                d.bbox.to_string(),
            ]
        })
        .collect();
    html.push_str(&table(&headers, &rows));
    if report.processed_png.is_some() {
        html.push_str(
            "<img class=\"processed\" src=\"/media/processed\" alt=\"Processed Image with Detections\">\n",
        );
    }
    html
}

fn video_results(summary: &VideoDetectionResult) -> String {
    let mut html = banner(Level::Success, "Video Analysis Complete!");
    html.push_str("<h4>Detection Summary:</h4>\n");
    html.push_str(&metric("Total Potholes Found", summary.total_potholes));
    html.push_str(&metric("Total Cracks Found", summary.total_cracks));
    html
}

fn failure_banner(failure: &AnalysisFailure) -> String {
    let level = if failure.is_warning() {
        Level::Warning
    } else {
        Level::Error
    };
    banner(level, &failure.to_string())
}

/// Upload & analyze page for the session's current state.
pub fn upload_page(session: &DashboardSession, assets: &PageAssets, notices: &[Notice]) -> String {
    let mut body = String::from(
        "<h1>Welcome to PaveSafe.AI</h1>\n<h2>Upload Road Image or Video for Analysis</h2>\n\
         <p>Upload an image or a video file containing road surfaces. The model will analyze it \
         to detect and classify potential cracks and potholes.</p>\n",
    );
    for notice in notices {
        body.push_str(&banner(notice.level, &notice.text));
    }
    body.push_str(&upload_form(session.file().is_some()));

    let file = match session.file() {
        Some(file) => file,
        None => {
            body.push_str(&banner(
                Level::Info,
                "Upload a file using the uploader above to get started.",
            ));
            return layout("Upload", assets, true, &body);
        }
    };

    body.push_str("<hr>\n");
    body.push_str(&file_details(file));
    body.push_str("<div class=\"columns\">\n<div class=\"column\">\n");
    body.push_str(&preview(file));
    body.push_str("</div>\n<div class=\"column\">\n");
    match session.state() {
        SessionState::Idle => {}
        SessionState::FilePresent(file) => match file.media_kind() {
            MediaKind::Image => {
                body.push_str(&banner(Level::Info, "Click 'Analyze File' to process the image."))
            }
            MediaKind::Video => {
                body.push_str(&banner(Level::Info, "Click 'Analyze File' to process the video."))
            }
            MediaKind::Unsupported => body.push_str(&banner(
                Level::Warning,
                "Unsupported file type; no preview available.",
            )),
        },
        SessionState::Analyzing(_) => {
            body.push_str(&banner(Level::Info, "Analyzing... Please wait."))
        }
        SessionState::Result { outcome, .. } => match outcome {
            AnalysisReport::Image(report) => body.push_str(&image_results(report)),
            AnalysisReport::Video(summary) => body.push_str(&video_results(summary)),
        },
        SessionState::Error { failure, .. } => body.push_str(&failure_banner(failure)),
    }
    body.push_str("</div>\n</div>\n");
    layout("Upload", assets, true, &body)
}

fn map_section(map: &MapView) -> String {
    let mut html = String::from("<h3>Detection Locations Map</h3>\n");
    match map {
        MapView::MissingCoordinates => html.push_str(&banner(
            Level::Info,
            "Coordinate data (Latitude, Longitude columns) not found or is invalid.",
        )),
        MapView::NoValidCoordinates => html.push_str(&banner(
            Level::Info,
            "No valid coordinates found in the data to display on map.",
        )),
        MapView::Points(points) => {
            html.push_str("<ul class=\"map-points\">\n");
            for point in points.iter().take(MAP_POINT_LIMIT) {
                html.push_str(&format!(
                    "<li><a href=\"https://www.openstreetmap.org/?mlat={lat}&amp;mlon={lon}#map=15/{lat}/{lon}\">{lat:.5}, {lon:.5}</a></li>\n",
                    lat = point.latitude,
                    lon = point.longitude
                ));
            }
            html.push_str("</ul>\n");
            if points.len() > MAP_POINT_LIMIT {
                html.push_str(&banner(
                    Level::Info,
                    &format!("Showing {MAP_POINT_LIMIT} of {} locations.", points.len()),
                ));
            }
        }
    }
    html
}

/// Rows of the describe table, one per statistic, one column per field.
fn describe_rows(numeric: &[NumericSummary]) -> Vec<Vec<String>> {
    let fmt = |value: f64| format!("{value:.6}");
    let mut rows: Vec<Vec<String>> = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        .iter()
        .map(|name| vec![name.to_string()])
        .collect();
    for n in numeric {
        rows[0].push(n.count.to_string());
        rows[1].push(fmt(n.mean));
        rows[2].push(n.std.map(fmt).unwrap_or_else(|| "NaN".to_string()));
        rows[3].push(fmt(n.min));
        rows[4].push(fmt(n.q25));
        rows[5].push(fmt(n.median));
        rows[6].push(fmt(n.q75));
        rows[7].push(fmt(n.max));
    }
    rows
}

fn summary_section(summary: &StatisticsSummary) -> String {
    let mut html = String::from("<h3>Summary Statistics</h3>\n");
    if summary.is_empty() {
        html.push_str(&banner(
            Level::Info,
            "No data available to calculate statistics.",
        ));
        return html;
    }
    html.push_str(&metric("Total Detections Logged", summary.total_rows));
    html.push_str(&metric("Potholes Logged", summary.potholes));
    html.push_str(&metric("Cracks Logged", summary.cracks));
    if !summary.numeric.is_empty() {
        let mut headers = vec![String::new()];
        headers.extend(summary.numeric.iter().map(|n| n.column.to_string()));
        html.push_str("<details><summary>Detailed Numeric Stats</summary>\n");
        html.push_str(&table(&headers, &describe_rows(&summary.numeric)));
        html.push_str("</details>\n");
    }
    html
}

/// Statistics page for a loaded log, or the message for why it failed.
pub fn statistics_page(
    outcome: &Result<(DetectionLog, StatisticsSummary), StatsError>,
    csv_path: &Path,
    assets: &PageAssets,
) -> String {
    let mut body = String::from(
        "<h1>Detection Statistics</h1>\n<h2>View Recorded Detection Data</h2>\n\
         <p>Aggregated detection data, including coordinates and severity, logged during \
         analysis sessions.</p>\n",
    );
    match outcome {
        Ok((log, summary)) => {
            body.push_str("<h3>Detection Log</h3>\n");
            body.push_str(&table(&log.headers, &log.cells));
            body.push_str("<hr>\n<div class=\"columns\">\n<div class=\"column\">\n");
            body.push_str(&summary_section(summary));
            body.push_str("</div>\n<div class=\"column\">\n");
            body.push_str(&map_section(&summary.map));
            body.push_str("</div>\n</div>\n");
        }
        Err(StatsError::NotFound(_)) => body.push_str(&banner(
            Level::Error,
            &format!(
                "Statistics file not found at '{}'. Please ensure it exists.",
                csv_path.display()
            ),
        )),
        Err(StatsError::Empty(_)) => body.push_str(&banner(
            Level::Warning,
            &format!("The statistics file '{}' is empty.", csv_path.display()),
        )),
        Err(err) => body.push_str(&banner(
            Level::Error,
            &format!("An error occurred while loading or processing the statistics data: {err}"),
        )),
    }
    layout("Statistics", assets, false, &body)
}

pub fn about_page(assets: &PageAssets) -> String {
    let body = "<h1>About PaveSafe.AI</h1>\n\
<h2>Project Overview</h2>\n\
<p><b>PaveSafe.AI</b> automates the detection and classification of road surface defects such as \
cracks and potholes, to improve road safety, optimize maintenance schedules and reduce the cost of \
manual inspections.</p>\n\
<h2>Problem Statement</h2>\n<ul>\n\
<li>Manual road inspection is time-consuming, subjective and potentially hazardous.</li>\n\
<li>Late detection of potholes and cracks leads to further degradation, vehicle damage and accidents.</li>\n\
<li>Missing geo-tagged data hinders allocating maintenance resources.</li>\n</ul>\n\
<h2>Methodology</h2>\n<details><summary>Click to view methodology details</summary>\n<ol>\n\
<li><b>Data acquisition:</b> road images and videos from standard or vehicle-mounted cameras.</li>\n\
<li><b>Preprocessing:</b> cleaning, resizing and augmenting the dataset.</li>\n\
<li><b>Model development:</b> a deep-learning detector trained to classify defects.</li>\n\
<li><b>Training &amp; validation:</b> evaluation with precision, recall and mAP.</li>\n\
<li><b>Deployment:</b> the model is served behind this dashboard.</li>\n\
<li><b>GIS integration:</b> detections linked to GPS coordinates for mapping.</li>\n</ol>\n</details>\n\
<h2>Key Features</h2>\n<ul>\n\
<li><b>Automated detection</b> of cracks and potholes in images and videos.</li>\n\
<li><b>Classification</b> into pothole, crack, longitudinal and transverse crack.</li>\n\
<li><b>Statistics</b> over logged detections with a locations overview.</li>\n</ul>\n";
    layout("Project Info", assets, false, body)
}

/// Minimal page for requests that never reached a handler.
pub fn error_page(assets: &PageAssets, message: &str) -> String {
    let body = format!(
        "<h1>Something went wrong</h1>\n{}<p><a href=\"/\">Back to upload</a></p>\n",
        banner(Level::Error, message)
    );
    layout("Error", assets, false, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pavecore::detection::{BoundingBox, DefectLabel, Detection};
    use pavecore::stats::{parse_detection_log, summarize};
    use std::path::PathBuf;

    fn assets() -> PageAssets {
        PageAssets::default()
    }

    fn analyzed_session(report: AnalysisReport) -> DashboardSession {
        let mut session = DashboardSession::new();
        session
            .select(UploadedFile::accept("road.png", None, vec![1]).unwrap())
            .unwrap();
        session.begin_analysis().unwrap();
        session.finish(Ok(report)).unwrap();
        session
    }

    fn stats_page(csv: &str) -> String {
        let log = parse_detection_log(csv.as_bytes()).unwrap();
        let summary = summarize(&log);
        statistics_page(&Ok((log, summary)), &PathBuf::from("data/x.csv"), &assets())
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn idle_page_invites_an_upload() {
        let html = upload_page(&DashboardSession::new(), &assets(), &[]);
        assert!(html.contains("to get started"));
        assert!(!html.contains("Analyze File"));
    }

    #[test]
    fn image_results_render_table_and_processed_image() {
        let bbox = BoundingBox::new(5, 6, 40, 50, 100, 100).unwrap();
        let report = AnalysisReport::Image(ImageReport {
            detections: vec![Detection::new(DefectLabel::Pothole, 0.87, bbox).unwrap()],
            potholes: 1,
            cracks: 0,
            processed_png: Some(vec![0]),
        });
        let html = upload_page(&analyzed_session(report), &assets(), &[]);
        assert!(html.contains("Analysis Complete!"));
        assert!(html.contains("<td>pothole</td><td>0.87</td><td>[5, 6, 40, 50]</td>"));
        assert!(html.contains("/media/processed"));
        assert!(html.contains("Potholes Detected</span><span class=\"metric-value\">1<"));
    }

    #[test]
    fn empty_image_results_say_no_defects() {
        let report = AnalysisReport::Image(ImageReport {
            detections: Vec::new(),
            potholes: 0,
            cracks: 0,
            processed_png: None,
        });
        let html = upload_page(&analyzed_session(report), &assets(), &[]);
        assert!(html.contains("No defects detected in the image."));
    }

    #[test]
    fn video_results_show_totals() {
        let report = AnalysisReport::Video(VideoDetectionResult {
            total_potholes: 12,
            total_cracks: 34,
            processed_video_path: None,
        });
        let html = upload_page(&analyzed_session(report), &assets(), &[]);
        assert!(html.contains("Total Potholes Found"));
        assert!(html.contains(">12<") && html.contains(">34<"));
    }

    #[test]
    fn uploaded_names_are_escaped() {
        let mut session = DashboardSession::new();
        session
            .select(UploadedFile::accept("<script>.png", None, vec![]).unwrap())
            .unwrap();
        let html = upload_page(&session, &assets(), &[]);
        assert!(html.contains("&lt;script&gt;.png"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn statistics_distinguish_na_from_zero() {
        let no_column = stats_page("Latitude,Longitude\n18.5,73.8\n");
        assert!(no_column.contains("Potholes Logged</span><span class=\"metric-value\">N/A"));

        let zero = stats_page("Defect_Type\nrutting\n");
        assert!(zero.contains("Potholes Logged</span><span class=\"metric-value\">0"));
    }

    #[test]
    fn statistics_replace_map_without_coordinates() {
        let html = stats_page("Defect_Type\ncrack\n");
        assert!(html.contains("Coordinate data (Latitude, Longitude columns) not found"));
        assert!(!html.contains("map-points"));
    }

    #[test]
    fn statistics_errors_have_distinct_messages() {
        let path = PathBuf::from("data/detection_stats.csv");
        let not_found = statistics_page(&Err(StatsError::NotFound(path.clone())), &path, &assets());
        let empty = statistics_page(&Err(StatsError::Empty(path.clone())), &path, &assets());
        assert!(not_found.contains("not found"));
        assert!(empty.contains("is empty"));
        assert!(empty.contains("banner warning"));
        assert_ne!(not_found, empty);
    }

    #[test]
    fn missing_stylesheet_is_reported_on_main_page_only() {
        let assets = PageAssets {
            stylesheet_error: Some("CSS file not found: style.css".into()),
            ..Default::default()
        };
        assert!(upload_page(&DashboardSession::new(), &assets, &[]).contains("CSS file not found"));
        assert!(!about_page(&assets).contains("CSS file not found"));
    }
}
