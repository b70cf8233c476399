//! Download orchestration and the service facade used by the HTTP layer
//!
//! [`Downloader`] routes a request to a source (direct fetch or extractor)
//! and logs progress. [`VideoService`] bundles it with the metadata
//! extractor behind the four operations the API exposes.

use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::logging::log_operation;
use crate::download::metadata::MetadataExtractor;
use crate::download::progress::spawn_progress_logger;
use crate::download::source::{DownloadRequest, SourceRegistry};
use crate::download::temp_file::TempFile;
use crate::download::types::{Format, VideoInfo};

pub struct Downloader {
    registry: SourceRegistry,
}

impl Downloader {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        Ok(Self {
            registry: SourceRegistry::default_registry(config)?,
        })
    }

    pub fn with_registry(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    /// Name of the source that would serve `request`
    pub fn route(&self, request: &DownloadRequest) -> Option<String> {
        self.registry.resolve(request).map(|s| s.name().to_string())
    }

    pub async fn download(&self, request: &DownloadRequest) -> AppResult<TempFile> {
        let source = self.registry.resolve(request).ok_or_else(|| {
            AppError::Validation(format!("No download source supports {}", request.url))
        })?;

        let started = Instant::now();
        let label = format!("{} {}", source.name(), request.kind.label());
        let (progress_tx, progress_task) = spawn_progress_logger(label);

        let result = source.download(request, progress_tx).await;
        // The sender was moved into the source, so the logger ends by itself
        if let Err(e) = progress_task.await {
            log::debug!("Progress logger task ended abnormally: {}", e);
        }

        let detail = match &result {
            Ok(file) => format!("source={} url={} bytes={}", source.name(), request.url, file.len()),
            Err(_) => format!("source={} url={}", source.name(), request.url),
        };
        log_operation(&format!("download_{}", request.kind.label()), &detail, started, &result);
        result
    }

    pub async fn download_video(&self, url: &Url) -> AppResult<TempFile> {
        self.download(&DownloadRequest::video(url.clone())).await
    }

    /// Audio is always extracted by the extractor, even for direct links
    pub async fn download_audio(&self, url: &Url, format: &str) -> AppResult<TempFile> {
        self.download(&DownloadRequest::audio(url.clone(), format)).await
    }
}

/// Everything a request handler needs, built once at startup
pub struct VideoService {
    config: Arc<AppConfig>,
    extractor: MetadataExtractor,
    downloader: Downloader,
}

impl VideoService {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        Ok(Self {
            extractor: MetadataExtractor::new(Arc::clone(&config)),
            downloader: Downloader::new(Arc::clone(&config))?,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    pub async fn extract_info(&self, url: &Url) -> AppResult<VideoInfo> {
        self.extractor.extract_info(url).await
    }

    pub async fn get_formats(&self, url: &Url) -> AppResult<Vec<Format>> {
        self.extractor.get_formats(url).await
    }

    pub async fn download_video(&self, url: &Url) -> AppResult<TempFile> {
        self.downloader.download_video(url).await
    }

    pub async fn download_audio(&self, url: &Url, format: &str) -> AppResult<TempFile> {
        self.downloader.download_audio(url, format).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::download::progress::ProgressSender;
    use crate::download::source::DownloadSource;

    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DownloadSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn supports(&self, _request: &DownloadRequest) -> bool {
            true
        }

        async fn download(&self, _request: &DownloadRequest, _progress_tx: ProgressSender) -> AppResult<TempFile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::NonZeroExit {
                code: Some(1),
                output_tail: "ERROR: nope".to_string(),
            })
        }
    }

    #[test]
    fn test_route_by_classification() {
        let downloader = Downloader::new(Arc::new(AppConfig::default())).unwrap();
        let direct = Url::parse("https://cdn.example.com/a.webm").unwrap();
        let page = Url::parse("https://example.com/watch/1").unwrap();

        assert_eq!(downloader.route(&DownloadRequest::video(direct.clone())).as_deref(), Some("http"));
        assert_eq!(downloader.route(&DownloadRequest::video(page)).as_deref(), Some("yt-dlp"));
        assert_eq!(downloader.route(&DownloadRequest::audio(direct, "mp3")).as_deref(), Some("yt-dlp"));
    }

    #[tokio::test]
    async fn test_download_does_not_retry() {
        let source = Arc::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let mut registry = SourceRegistry::new();
        registry.register(source.clone());
        let downloader = Downloader::with_registry(registry);

        let err = downloader
            .download_video(&Url::parse("https://example.com/x").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "non_zero_exit");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_download_without_source_is_validation_error() {
        let downloader = Downloader::with_registry(SourceRegistry::new());
        let err = downloader
            .download_video(&Url::parse("https://example.com/x").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
