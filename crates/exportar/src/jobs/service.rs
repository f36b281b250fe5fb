//! Export-job HTTP service.
//!
//! Four endpoints under `/export/video`: start a job, poll its
//! descriptor, download the finished artifact, and list all jobs.
//! Bad input is rejected with a 400 at request time — a job that fails
//! validation is never registered as `running`. Every request lazily
//! sweeps expired jobs, so a client polling a long-gone id gets the 404
//! it should treat as "expired, re-export".

use super::{video_filename, JobRegistry, JobStatus, VideoJob};
use crate::options::{parse_dimensions, VideoOptions};
use crate::range::{parse_range, require_contiguous};
use crate::result::ExportResult;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Route prefix of the video-export surface
pub const ROUTE_PREFIX: &str = "/export/video";

/// Upper bound used to validate range expressions before the deck is
/// consulted (request-time contiguity check)
const MAX_REQUEST_SLIDES: u32 = 10_000;

/// Body of `POST /export/video`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoExportRequest {
    /// Range expression
    pub range: Option<String>,
    /// Frames per second
    pub fps: Option<u32>,
    /// `"WxH"` output size
    pub size: Option<String>,
    /// Dwell per step in milliseconds
    pub interval: Option<u64>,
    /// Capture-side motion dilation
    pub motion_scale: Option<f64>,
    /// Dark color scheme
    pub dark: Option<bool>,
    /// Base component of the output filename
    pub base: Option<String>,
}

impl VideoExportRequest {
    /// Resolve into validated [`VideoOptions`]
    pub fn to_video_options(&self) -> ExportResult<VideoOptions> {
        let mut video = VideoOptions::default();
        if let Some(fps) = self.fps {
            video.fps = fps;
        }
        if let Some(interval) = self.interval {
            video.interval_ms = interval;
        }
        if let Some(scale) = self.motion_scale {
            video.motion_scale = scale;
        }
        if let Some(ref size) = self.size {
            let (width, height) = parse_dimensions(size)?;
            video.width = width;
            video.height = height;
        }
        video.validate()?;
        Ok(video)
    }

    /// Request-time range validation: parses the expression and requires
    /// contiguity, without consulting the deck
    pub fn validate_range(&self) -> ExportResult<()> {
        match self.range.as_deref().map(str::trim) {
            None | Some("") => Ok(()),
            Some(expr) if expr.eq_ignore_ascii_case("all") => Ok(()),
            Some(expr) => {
                let expanded = parse_range(Some(expr), MAX_REQUEST_SLIDES)?;
                require_contiguous(&expanded)
            }
        }
    }
}

/// Runs the actual export pipeline for one job.
///
/// Injected so the HTTP layer is testable without a browser or ffmpeg;
/// production wires this to the capture pipeline.
pub type JobRunner =
    Arc<dyn Fn(VideoExportRequest, PathBuf) -> BoxFuture<'static, ExportResult<()>> + Send + Sync>;

/// The video-export job service
pub struct VideoJobService {
    registry: Arc<JobRegistry>,
    runner: JobRunner,
    output_dir: PathBuf,
    default_base: String,
}

impl VideoJobService {
    /// Create a service writing artifacts under `output_dir`
    pub fn new(runner: JobRunner, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            runner,
            output_dir: output_dir.into(),
            default_base: "slides-export".to_string(),
        }
    }

    /// Override the default filename base
    #[must_use]
    pub fn with_default_base(mut self, base: impl Into<String>) -> Self {
        self.default_base = base.into();
        self
    }

    /// The job registry (shared with the spawned job tasks)
    #[must_use]
    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    /// Build the axum router for the service
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route(ROUTE_PREFIX, post(start_job))
            .route(&format!("{ROUTE_PREFIX}/jobs"), get(list_jobs))
            .route(&format!("{ROUTE_PREFIX}/{{id}}"), get(job_status))
            .route(&format!("{ROUTE_PREFIX}/{{id}}/download"), get(download))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self)
    }

    /// Validate and launch one job; returns the job id
    fn start(&self, request: VideoExportRequest) -> ExportResult<Uuid> {
        let video = request.to_video_options()?;
        request.validate_range()?;
        std::fs::create_dir_all(&self.output_dir)?;

        let id = Uuid::new_v4();
        let base = request.base.as_deref().unwrap_or(&self.default_base);
        let filename = video_filename(
            base,
            request.range.as_deref(),
            video.fps,
            video.width,
            video.height,
            Utc::now(),
            id,
        );
        let file = self.output_dir.join(filename);
        self.registry.register(id, file.clone());

        let registry = self.registry();
        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            match runner(request, file).await {
                Ok(()) => registry.complete(id),
                Err(e) => registry.fail(id, e.to_string()),
            }
        });
        Ok(id)
    }
}

/// Job descriptor returned by the poll and list endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Job id
    pub job_id: Uuid,
    /// Lifecycle state
    pub status: JobStatus,
    /// Output path, present once the artifact exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// Completion timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Elapsed milliseconds (pinned after completion)
    pub duration_ms: i64,
    /// Basename of the output file
    pub filename: String,
    /// Download link, present only when `status == done`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl JobDescriptor {
    fn from_job(job: &VideoJob, now: DateTime<Utc>) -> Self {
        let done = job.status == JobStatus::Done;
        let download_url =
            (done && job.file.exists()).then(|| format!("{ROUTE_PREFIX}/{}/download", job.id));
        Self {
            job_id: job.id,
            status: job.status,
            file: done.then(|| job.file.display().to_string()),
            error: job.error.clone(),
            started_at: job.started_at,
            completed_at: job.completed_at,
            duration_ms: job.duration_ms(now),
            filename: job.filename(),
            download_url,
        }
    }
}

async fn start_job(
    State(service): State<Arc<VideoJobService>>,
    Json(request): Json<VideoExportRequest>,
) -> Response {
    service.registry.sweep();
    match service.start(request) {
        Ok(id) => (StatusCode::OK, Json(json!({ "jobId": id }))).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn job_status(
    State(service): State<Arc<VideoJobService>>,
    Path(id): Path<String>,
) -> Response {
    service.registry.sweep();
    match lookup(&service, &id) {
        Some(job) => Json(JobDescriptor::from_job(&job, Utc::now())).into_response(),
        None => not_found(),
    }
}

async fn download(
    State(service): State<Arc<VideoJobService>>,
    Path(id): Path<String>,
) -> Response {
    service.registry.sweep();
    let Some(job) = lookup(&service, &id) else {
        return not_found();
    };
    if job.status != JobStatus::Done || !job.file.exists() {
        return not_found();
    }
    match tokio::fs::read(&job.file).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "video/mp4")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", job.filename()),
            )
            .body(axum::body::Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(_) => not_found(),
    }
}

async fn list_jobs(State(service): State<Arc<VideoJobService>>) -> Response {
    service.registry.sweep();
    let now = Utc::now();
    let jobs: Vec<JobDescriptor> = service
        .registry
        .list()
        .iter()
        .map(|job| JobDescriptor::from_job(job, now))
        .collect();
    Json(json!({ "jobs": jobs })).into_response()
}

fn lookup(service: &VideoJobService, id: &str) -> Option<VideoJob> {
    let id = Uuid::parse_str(id).ok()?;
    service.registry.get(id)
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Export job not found" })),
    )
        .into_response()
}
