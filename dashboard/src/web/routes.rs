use crate::web::assets::PageAssets;
use crate::web::render::{self, Level, Notice};
use crate::web::sessions::{SessionStore, SESSION_COOKIE};
use crate::workflow::runner::{AnalysisFailure, AnalysisReport, Runner};
use bytes::BufMut;
use futures_util::TryStreamExt;
use pavecore::stats::{load_detection_log, summarize, StatsError};
use pavecore::upload::{MediaKind, SessionError, SessionState, UploadError, UploadedFile};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::{header, Response, StatusCode};
use warp::multipart::{FormData, Part};
use warp::reply::Reply;
use warp::Filter;

const SESSION_CAPACITY: usize = 64;

/// Shared state behind every route.
pub struct Dashboard {
    runner: Runner,
    sessions: SessionStore,
}

impl Dashboard {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            sessions: SessionStore::new(SESSION_CAPACITY),
        }
    }

    fn assets(&self) -> PageAssets {
        let config = self.runner.config();
        PageAssets::load(&config.stylesheet, &config.assets_dir)
    }
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Option<String>, Vec<u8>)>,
    action: Option<String>,
}

impl UploadForm {
    fn wants_analysis(&self) -> bool {
        self.action.as_deref() == Some("analyze")
    }
}

async fn read_part(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut buffer, chunk| async move {
            buffer.put(chunk);
            Ok(buffer)
        })
        .await
}

async fn collect_form(mut form: FormData) -> Result<UploadForm, warp::Error> {
    let mut upload = UploadForm::default();
    while let Some(part) = form.try_next().await? {
        let field = part.name().to_string();
        match field.as_str() {
            "file" => {
                let name = part.filename().unwrap_or_default().to_string();
                let content_type = part.content_type().map(str::to_string);
                let bytes = read_part(part).await?;
                if !name.is_empty() {
                    upload.file = Some((name, content_type, bytes));
                }
            }
            "action" => {
                let bytes = read_part(part).await?;
                upload.action = Some(String::from_utf8_lossy(&bytes).trim().to_string());
            }
            _ => {}
        }
    }
    Ok(upload)
}

fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

fn html_response(body: String, status: StatusCode, session: &str) -> warp::reply::Response {
    let reply = warp::reply::with_status(warp::reply::html(body), status);
    warp::reply::with_header(reply, header::SET_COOKIE, session_cookie(session)).into_response()
}

fn upload_page(dashboard: &Dashboard, session: &str, notices: &[Notice]) -> warp::reply::Response {
    let assets = dashboard.assets();
    let body = dashboard
        .sessions
        .with_session(session, |s| render::upload_page(s, &assets, notices));
    html_response(body, StatusCode::OK, session)
}

fn session_notice(err: SessionError) -> Notice {
    match err {
        SessionError::NoFile => Notice::new(Level::Info, "Upload a file before starting an analysis."),
        SessionError::InvalidTransition { .. } => Notice::new(
            Level::Warning,
            "An analysis is already running for this session. Please wait.",
        ),
    }
}

/// Moves the session to `Analyzing`, runs the model off the async threads
/// and stores the outcome.
async fn run_analysis(dashboard: &Arc<Dashboard>, session: &str) -> Vec<Notice> {
    let file = dashboard.sessions.with_session(session, |s| {
        if matches!(s.state(), SessionState::Result { .. } | SessionState::Error { .. }) {
            s.rearm()?;
        }
        s.begin_analysis()
    });
    let file = match file {
        Ok(file) => file,
        Err(err) => return vec![session_notice(err)],
    };

    let runner = dashboard.runner.clone();
    let outcome = tokio::task::spawn_blocking(move || runner.execute(&file))
        .await
        .unwrap_or_else(|err| {
            log::error!("analysis task failed: {err}");
            Err(AnalysisFailure::Aborted)
        });

    match dashboard.sessions.with_session(session, |s| s.finish(outcome)) {
        Ok(()) => Vec::new(),
        Err(err) => {
            log::warn!("session {session} changed during analysis: {err}");
            vec![Notice::new(Level::Error, "The session expired during analysis.")]
        }
    }
}

async fn handle_index(
    cookie: Option<String>,
    dashboard: Arc<Dashboard>,
) -> Result<warp::reply::Response, Infallible> {
    let session = dashboard.sessions.resolve(cookie);
    Ok(upload_page(&dashboard, &session, &[]))
}

async fn handle_upload(
    cookie: Option<String>,
    dashboard: Arc<Dashboard>,
    form: FormData,
) -> Result<warp::reply::Response, Infallible> {
    let session = dashboard.sessions.resolve(cookie);
    let form = match collect_form(form).await {
        Ok(form) => form,
        Err(err) => {
            log::warn!("reading upload failed: {err}");
            let notice = Notice::new(Level::Error, format!("Error reading the upload: {err}"));
            return Ok(upload_page(&dashboard, &session, &[notice]));
        }
    };
    let wants_analysis = form.wants_analysis();

    let accepted = form
        .file
        .ok_or(UploadError::NoFile)
        .and_then(|(name, content_type, bytes)| {
            UploadedFile::accept(name, content_type.as_deref(), bytes)
        });
    let file = match accepted {
        Ok(file) => file,
        Err(err) => {
            let level = match err {
                UploadError::NoFile => Level::Info,
                _ => Level::Warning,
            };
            let notice = Notice::new(level, err.to_string());
            return Ok(upload_page(&dashboard, &session, &[notice]));
        }
    };

    if let Err(err) = dashboard.sessions.with_session(&session, |s| s.select(file)) {
        return Ok(upload_page(&dashboard, &session, &[session_notice(err)]));
    }
    let notices = if wants_analysis {
        run_analysis(&dashboard, &session).await
    } else {
        Vec::new()
    };
    Ok(upload_page(&dashboard, &session, &notices))
}

async fn handle_analyze(
    cookie: Option<String>,
    dashboard: Arc<Dashboard>,
) -> Result<warp::reply::Response, Infallible> {
    let session = dashboard.sessions.resolve(cookie);
    let notices = run_analysis(&dashboard, &session).await;
    Ok(upload_page(&dashboard, &session, &notices))
}

async fn handle_reset(
    cookie: Option<String>,
    dashboard: Arc<Dashboard>,
) -> Result<warp::reply::Response, Infallible> {
    let session = dashboard.sessions.resolve(cookie);
    dashboard.sessions.with_session(&session, |s| s.reset());
    Ok(upload_page(&dashboard, &session, &[]))
}

fn bytes_response(content_type: &str, bytes: Vec<u8>) -> warp::reply::Response {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(bytes)
        .map(Reply::into_response)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_media(
    kind: String,
    cookie: Option<String>,
    dashboard: Arc<Dashboard>,
) -> Result<warp::reply::Response, Infallible> {
    let Some(id) = cookie else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let media = dashboard.sessions.inspect(&id, |s| match kind.as_str() {
        "upload" => s
            .file()
            .filter(|file| file.media_kind() != MediaKind::Unsupported)
            .map(|file| (file.content_type.clone(), file.bytes.clone())),
        "processed" => match s.state() {
            SessionState::Result {
                outcome: AnalysisReport::Image(report),
                ..
            } => report
                .processed_png
                .clone()
                .map(|png| ("image/png".to_string(), png)),
            _ => None,
        },
        _ => None,
    });
    Ok(match media.flatten() {
        Some((content_type, bytes)) => bytes_response(&content_type, bytes),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

async fn handle_statistics(dashboard: Arc<Dashboard>) -> Result<warp::reply::Response, Infallible> {
    let csv_path = dashboard.runner.config().stats_csv.clone();
    let outcome = load_detection_log(&csv_path).map(|log| {
        let summary = summarize(&log);
        (log, summary)
    });
    if let Err(err) = &outcome {
        log::warn!("statistics unavailable: {err}");
    }
    let body = render::statistics_page(&outcome, &csv_path, &dashboard.assets());
    Ok(warp::reply::html(body).into_response())
}

fn stats_error_status(err: &StatsError) -> (StatusCode, &'static str) {
    match err {
        StatsError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        StatsError::Empty(_) => (StatusCode::UNPROCESSABLE_ENTITY, "empty"),
        StatsError::Parse(_) | StatsError::TooManyFields { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "parse")
        }
        StatsError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
    }
}

async fn handle_statistics_json(
    dashboard: Arc<Dashboard>,
) -> Result<warp::reply::Response, Infallible> {
    let csv_path = &dashboard.runner.config().stats_csv;
    let reply = match load_detection_log(csv_path) {
        Ok(log) => warp::reply::with_status(
            warp::reply::json(&json!({ "status": "ok", "summary": summarize(&log) })),
            StatusCode::OK,
        ),
        Err(err) => {
            let (status, kind) = stats_error_status(&err);
            warp::reply::with_status(
                warp::reply::json(&json!({
                    "status": "error",
                    "kind": kind,
                    "message": err.to_string(),
                })),
                status,
            )
        }
    };
    Ok(reply.into_response())
}

async fn handle_health(dashboard: Arc<Dashboard>) -> Result<warp::reply::Response, Infallible> {
    let runner = &dashboard.runner;
    let body = json!({
        "status": "ok",
        "model_loaded": runner.cache().is_loaded(),
        "sessions": dashboard.sessions.len(),
        "metrics": runner.metrics().snapshot(),
    });
    Ok(warp::reply::json(&body).into_response())
}

async fn handle_rejection(
    dashboard: Arc<Dashboard>,
    rejection: warp::Rejection,
) -> Result<warp::reply::Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Page not found.".to_string())
    } else if rejection
        .find::<warp::reject::PayloadTooLarge>()
        .is_some()
    {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "The uploaded file exceeds the {} MB limit.",
                dashboard.runner.config().max_upload_mb
            ),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".to_string())
    } else {
        log::warn!("unhandled rejection: {rejection:?}");
        (StatusCode::BAD_REQUEST, "The request could not be processed.".to_string())
    };
    let body = render::error_page(&dashboard.assets(), &message);
    Ok(warp::reply::with_status(warp::reply::html(body), status).into_response())
}

/// All dashboard routes with their rejection handler.
pub fn routes(
    dashboard: Arc<Dashboard>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Infallible> + Clone {
    let state = {
        let dashboard = dashboard.clone();
        warp::any().map(move || dashboard.clone())
    };
    let cookie = warp::cookie::optional::<String>(SESSION_COOKIE);
    let max_upload = dashboard.runner.config().max_upload_bytes();

    let index = warp::path::end()
        .and(warp::get())
        .and(cookie.clone())
        .and(state.clone())
        .and_then(handle_index);

    let upload = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(cookie.clone())
        .and(state.clone())
        .and(warp::multipart::form().max_length(max_upload))
        .and_then(handle_upload);

    let analyze = warp::path("analyze")
        .and(warp::path::end())
        .and(warp::post())
        .and(cookie.clone())
        .and(state.clone())
        .and_then(handle_analyze);

    let reset = warp::path("reset")
        .and(warp::path::end())
        .and(warp::post())
        .and(cookie.clone())
        .and(state.clone())
        .and_then(handle_reset);

    let media = warp::path!("media" / String)
        .and(warp::get())
        .and(cookie)
        .and(state.clone())
        .and_then(handle_media);

    let statistics = warp::path("statistics")
        .and(warp::path::end())
        .and(warp::get())
        .and(state.clone())
        .and_then(handle_statistics);

    let about = warp::path("about")
        .and(warp::path::end())
        .and(warp::get())
        .and(state.clone())
        .and_then(|dashboard: Arc<Dashboard>| async move {
            Ok::<_, Infallible>(warp::reply::html(render::about_page(&dashboard.assets())).into_response())
        });

    let api_statistics = warp::path!("api" / "statistics")
        .and(warp::get())
        .and(state.clone())
        .and_then(handle_statistics_json);

    let api_health = warp::path!("api" / "health")
        .and(warp::get())
        .and(state.clone())
        .and_then(handle_health);

    let assets = warp::path("assets")
        .and(warp::fs::dir(dashboard.runner.config().assets_dir.clone()))
        .map(|file: warp::fs::File| file.into_response());

    let recover_state = dashboard.clone();
    index
        .or(upload)
        .unify()
        .or(analyze)
        .unify()
        .or(reset)
        .unify()
        .or(media)
        .unify()
        .or(statistics)
        .unify()
        .or(about)
        .unify()
        .or(api_statistics)
        .unify()
        .or(api_health)
        .unify()
        .or(assets)
        .unify()
        .recover(move |rejection: warp::Rejection| handle_rejection(recover_state.clone(), rejection))
        .unify()
}
