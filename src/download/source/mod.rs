//! Download backends and URL-based routing.
//!
//! Provides the `DownloadSource` trait and a `SourceRegistry` that picks the
//! first backend claiming a request.
//!
//! Built-in backends:
//! - `HttpSource`: direct container links (`.mp4`, `.webm`, `.mkv`) streamed over HTTP
//! - `YtDlpSource`: everything else, plus all audio extraction, via the extractor

pub mod http;
pub mod ytdlp;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::core::config::AppConfig;
use crate::core::error::AppResult;
use crate::download::progress::ProgressSender;
use crate::download::temp_file::TempFile;
use crate::download::types::MediaKind;

pub use crate::download::progress::SourceProgress;

/// Request parameters for a download operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub kind: MediaKind,
}

impl DownloadRequest {
    pub fn video(url: Url) -> Self {
        Self {
            url,
            kind: MediaKind::Video,
        }
    }

    pub fn audio(url: Url, format: impl Into<String>) -> Self {
        Self {
            url,
            kind: MediaKind::Audio { format: format.into() },
        }
    }
}

/// Trait for download backends.
///
/// A successful download returns a validated, non-empty [`TempFile`]. Every
/// error path drops the temp file before returning.
#[async_trait]
pub trait DownloadSource: Send + Sync {
    /// Human-readable name of this source (e.g., "yt-dlp", "http")
    fn name(&self) -> &str;

    /// Whether this source handles the request.
    fn supports(&self, request: &DownloadRequest) -> bool;

    /// Execute the download, sending progress updates through the channel.
    async fn download(&self, request: &DownloadRequest, progress_tx: ProgressSender) -> AppResult<TempFile>;
}

/// Registry that routes requests to the appropriate download source.
///
/// Sources are tried in order; the first source that claims the request is
/// used, so the direct fetcher is registered ahead of the extractor.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn DownloadSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a download source. Sources are tried in insertion order.
    pub fn register(&mut self, source: Arc<dyn DownloadSource>) {
        self.sources.push(source);
    }

    /// Find the first source that supports the request.
    pub fn resolve(&self, request: &DownloadRequest) -> Option<Arc<dyn DownloadSource>> {
        self.sources.iter().find(|s| s.supports(request)).cloned()
    }

    /// Direct fetcher first, extractor as the catch-all.
    pub fn default_registry(config: Arc<AppConfig>) -> AppResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(http::HttpSource::new(Arc::clone(&config))?));
        registry.register(Arc::new(ytdlp::YtDlpSource::new(config)));
        Ok(registry)
    }
}
