//! HTTP transport.
//!
//! Routes:
//! - `GET /stream?query=` live status lines as server-sent events, ending with `[DONE]`
//! - `POST /analyze` result of the execution last streamed for a query
//! - `POST /download` fresh run rendered as a file attachment
//! - `GET /health` liveness probe
//!
//! Every failure is answered with a JSON body `{"error": "..."}`.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{PipelineError, SynthesisError};
use crate::formatters::ExportFormat;
use crate::orchestrator::QueryOrchestrator;
use crate::progress::StatusStream;

/// Interval between keep-alive comments on an idle status stream.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Query parameters for the status stream.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    query: String,
}

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub query: String,
}

/// Body of `POST /download`.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub query: String,
    /// `text` (default), `markdown` or `json`.
    #[serde(default)]
    pub format: Option<String>,
}

/// Pipeline error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PipelineError::Validation { .. } => StatusCode::BAD_REQUEST,
            PipelineError::NoPapers => StatusCode::NOT_FOUND,
            PipelineError::NotReady { .. } => StatusCode::CONFLICT,
            PipelineError::Aggregation { .. }
            | PipelineError::Synthesis(
                SynthesisError::Http(_)
                | SynthesisError::Timeout(_)
                | SynthesisError::Status { .. }
                | SynthesisError::Parse(_)
                | SynthesisError::EmptyResponse,
            ) => StatusCode::BAD_GATEWAY,
            PipelineError::Synthesis(SynthesisError::EmptyInput) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        let body = serde_json::json!({ "error": self.0.to_user_message() });
        (status, Json(body)).into_response()
    }
}

/// Create the HTTP router.
pub fn create_router(orchestrator: QueryOrchestrator) -> Router {
    let cors = cors_layer(orchestrator.config().allowed_origin.as_deref());
    let limit = ConcurrencyLimitLayer::new(orchestrator.config().max_concurrent_requests);

    Router::new()
        .route("/health", get(health_check))
        .route("/stream", get(handle_stream))
        .route("/analyze", post(handle_analyze))
        .route("/download", post(handle_download))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(limit)
        .with_state(orchestrator)
}

/// CORS restricted to the configured frontend origin.
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = allowed_origin else {
        tracing::warn!("FRONTEND_ORIGIN not set, allowing any origin");
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        Err(e) => {
            tracing::warn!(
                origin = %origin,
                error = %e,
                "Invalid frontend origin, cross-origin requests disabled"
            );
            CorsLayer::new()
        }
    }
}

async fn health_check(State(orchestrator): State<QueryOrchestrator>) -> impl IntoResponse {
    let sources: Vec<String> = orchestrator
        .sources()
        .iter()
        .map(|s| s.id().to_string())
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "service": "scholar-digest",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": sources
    }))
}

/// Handle `GET /stream`: start an execution and relay its status lines.
async fn handle_stream(
    State(orchestrator): State<QueryOrchestrator>,
    Query(params): Query<StreamQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = orchestrator.start_query(&params.query).await?;

    tracing::info!(query = %params.query.trim(), "New status stream connection");

    Ok((
        [
            ("X-Accel-Buffering", "no"),
            ("Cache-Control", "no-cache, no-store, must-revalidate"),
        ],
        Sse::new(sse_events(status))
            .keep_alive(KeepAlive::new().interval(KEEPALIVE_INTERVAL).text("ping")),
    ))
}

/// One SSE `data:` event per status line; the stream closes after `[DONE]`.
fn sse_events(mut status: StatusStream) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = status.next().await {
            let terminal = event.is_terminal();
            yield Ok(Event::default().data(event.as_line()));
            if terminal {
                break;
            }
        }
    }
}

/// Handle `POST /analyze`.
async fn handle_analyze(
    State(orchestrator): State<QueryOrchestrator>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = orchestrator.fetch_result(&req.query).await?;
    Ok(Json(result))
}

/// Handle `POST /download`.
async fn handle_download(
    State(orchestrator): State<QueryOrchestrator>,
    Json(req): Json<DownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let format = match req.format.as_deref() {
        Some(raw) => raw
            .parse::<ExportFormat>()
            .map_err(PipelineError::validation)?,
        None => ExportFormat::default(),
    };

    let payload = orchestrator.export_result(&req.query, format).await?;
    let disposition = payload.content_disposition();

    Ok((
        [
            (header::CONTENT_TYPE, payload.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload.body,
    ))
}
