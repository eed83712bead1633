use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use buildlib::error::Error as StoreError;
use buildlib::types::JobId;
use buildlib::{BuildPipeline, Job, JobStatus};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pipeline: BuildPipeline,
}

impl AppState {
    pub fn new(pipeline: BuildPipeline) -> Self {
        Self { pipeline }
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub platform: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub job_id: JobId,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Invalid job id: {0}")]
    InvalidId(String),
    #[error("Job not found: {0}")]
    NotFound(JobId),
    #[error("Artifact for job {0} is not ready")]
    NotReady(JobId),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(job_id) => ApiError::NotFound(job_id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::NotReady(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health))
        .route("/build", post(start_build))
        .route("/job/{id}", get(job_status))
        .route("/job/{id}/logs", get(stream_logs))
        .route("/download/{id}", get(download))
        .layer(trace_layer)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[tracing::instrument(skip_all)]
async fn start_build(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, ApiError> {
    let job_id = state
        .pipeline
        .submit(request.platform, Value::Object(request.config))
        .await?;
    info!(%job_id, "build accepted");
    Ok(Json(BuildResponse { job_id }))
}

#[tracing::instrument(skip(state))]
async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job_id = parse_id(&id)?;
    let job = state.pipeline.store().get(job_id).await?;
    Ok(Json(job))
}

/// Replay the job's log and keep following it until the job finishes.
#[tracing::instrument(skip(state))]
async fn stream_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job_id = parse_id(&id)?;
    let lines = state.pipeline.store().subscribe(job_id).await?;
    let body = UnboundedReceiverStream::new(lines)
        .map(|line| Ok::<_, Infallible>(Bytes::from(line + "\n")));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

#[tracing::instrument(skip(state))]
async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job_id = parse_id(&id)?;
    let job = state.pipeline.store().get(job_id).await?;
    let file_path = match (job.status, job.file_path) {
        (JobStatus::Completed, Some(file_path)) => file_path,
        _ => return Err(ApiError::NotReady(job_id)),
    };

    let file = tokio::fs::File::open(&file_path).await.map_err(|err| {
        ApiError::Internal(format!("cannot open {}: {}", file_path.display(), err))
    })?;
    let length = file.metadata().await.map(|meta| meta.len()).ok();
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    if let Ok(disposition) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, length.into());
    }
    Ok(response)
}

fn parse_id(id: &str) -> Result<JobId, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId(id.to_string()))
}
