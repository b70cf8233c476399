//! HTTP API server.
//!
//! Routes (served at the root and mirrored under `/api/video`):
//! - `GET /info?url=`                    - video metadata (JSON)
//! - `GET /formats?url=`                 - ranked format list (JSON)
//! - `GET /download?url=`                - video file
//! - `GET /download/audio?url=&format=`  - extracted audio file (default mp3)
//! - `GET /health`                       - health check

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;

use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::{validate_audio_format, validate_http_url};
use crate::download::{Format, TempFile, VideoInfo, VideoService};

/// Audio format used when the query omits `format`
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";

/// Prefix the API is additionally mounted under
pub const API_PREFIX: &str = "/api/video";

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    service: Arc<VideoService>,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioQuery {
    url: Option<String>,
    format: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Spawn { .. } | AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MalformedOutput { .. }
            | AppError::NonZeroExit { .. }
            | AppError::EmptyOrMissingFile { .. }
            | AppError::Http(_)
            | AppError::HttpStatus(_) => StatusCode::BAD_GATEWAY,
            AppError::Io(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

/// Builds the router with all API routes.
pub fn build_router(service: Arc<VideoService>) -> Router {
    let api = Router::new()
        .route("/info", get(info_handler))
        .route("/formats", get(formats_handler))
        .route("/download", get(download_video_handler))
        .route("/download/audio", get(download_audio_handler));

    Router::new()
        .merge(api.clone())
        .nest(API_PREFIX, api)
        .route("/health", get(health_handler))
        .with_state(AppState { service })
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_web_server(config: &AppConfig, service: Arc<VideoService>) -> AppResult<()> {
    let addr = config.bind_address();
    let app = build_router(service);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting web server on http://{}", addr);
    log::info!("  /info, /formats, /download, /download/audio (also under {})", API_PREFIX);
    log::info!("  /health     - Health check");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    log::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

/// GET /info
async fn info_handler(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> AppResult<Json<VideoInfo>> {
    let url = validate_http_url(query.url.as_deref().unwrap_or_default())?;
    Ok(Json(state.service.extract_info(&url).await?))
}

/// GET /formats
async fn formats_handler(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> AppResult<Json<Vec<Format>>> {
    let url = validate_http_url(query.url.as_deref().unwrap_or_default())?;
    Ok(Json(state.service.get_formats(&url).await?))
}

/// GET /download
async fn download_video_handler(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> AppResult<Response> {
    let url = validate_http_url(query.url.as_deref().unwrap_or_default())?;
    let file = state.service.download_video(&url).await?;
    file_response(file, "video").await
}

/// GET /download/audio
async fn download_audio_handler(
    State(state): State<AppState>,
    Query(query): Query<AudioQuery>,
) -> AppResult<Response> {
    let url = validate_http_url(query.url.as_deref().unwrap_or_default())?;
    let format = validate_audio_format(
        query.format.as_deref().unwrap_or(DEFAULT_AUDIO_FORMAT),
        state.service.config(),
    )?;
    let file = state.service.download_audio(&url, &format).await?;
    file_response(file, "audio").await
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// `attachment; filename="<base>.<ext>"`
pub fn content_disposition(base: &str, ext: &str) -> String {
    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let ext = if ext.is_empty() { "bin".to_string() } else { ext };
    format!("attachment; filename=\"{}.{}\"", base, ext)
}

/// Streams a validated temp file; the file is deleted once the body is dropped.
async fn file_response(file: TempFile, base: &str) -> AppResult<Response> {
    let disposition = content_disposition(base, &file.extension().unwrap_or_default());
    let length = file.len();
    let reader = tokio::fs::File::open(file.path()).await?;

    let stream = ReaderStream::new(reader).map(move |chunk: std::io::Result<Bytes>| {
        // Ties the temp file's lifetime to the response body
        let _owner = &file;
        chunk
    });

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
