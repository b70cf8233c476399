//! HttpSource: direct HTTP download of container files.
//!
//! Handles URLs whose path ends in a configured container extension
//! (`https://cdn.example.com/clip.mp4`). The body is streamed chunk by chunk
//! into a temp file with a progress event every MiB. No retry, no resume:
//! any failure drops the partial file and ends the request.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::download::classifier::DomainClassifier;
use crate::download::progress::{ProgressSender, SourceProgress};
use crate::download::source::{DownloadRequest, DownloadSource};
use crate::download::temp_file::TempFile;
use crate::download::types::MediaKind;

/// Bytes between two progress events
pub const PROGRESS_INTERVAL_BYTES: u64 = 1024 * 1024;

/// Download source for direct HTTP file downloads.
pub struct HttpSource {
    client: Client,
    config: Arc<AppConfig>,
    classifier: DomainClassifier,
}

impl HttpSource {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.download_timeout())
            .connect_timeout(config.http_connect_timeout())
            .read_timeout(config.http_read_timeout())
            .build()?;
        let classifier = DomainClassifier::from_config(&config);

        Ok(Self {
            client,
            config,
            classifier,
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::Timeout {
                operation: "direct download",
                after: self.config.download_timeout(),
                output_tail: err.to_string(),
            }
        } else {
            AppError::Http(err)
        }
    }

    /// Streams `request.url` into `temp`, returning the number of bytes written
    async fn fetch_into(
        &self,
        request: &DownloadRequest,
        temp: &TempFile,
        progress_tx: &ProgressSender,
    ) -> AppResult<u64> {
        let response = self
            .client
            .get(request.url.as_str())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }

        let total_size = response.content_length();
        let mut file = tokio::fs::File::create(temp.path()).await?;
        let mut downloaded: u64 = 0;
        let mut next_report = PROGRESS_INTERVAL_BYTES;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_request_error(e))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if downloaded >= next_report {
                next_report = (downloaded / PROGRESS_INTERVAL_BYTES + 1) * PROGRESS_INTERVAL_BYTES;
                let _ = progress_tx.send(SourceProgress {
                    percent: total_size
                        .filter(|t| *t > 0)
                        .map(|total| ((downloaded as f64 / total as f64) * 100.0).min(100.0) as u8),
                    speed_bytes_sec: None,
                    eta_seconds: None,
                    downloaded_bytes: Some(downloaded),
                    total_bytes: total_size,
                });
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(downloaded)
    }
}

#[async_trait]
impl DownloadSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn supports(&self, request: &DownloadRequest) -> bool {
        request.kind == MediaKind::Video && self.classifier.is_direct_media(&request.url)
    }

    async fn download(&self, request: &DownloadRequest, progress_tx: ProgressSender) -> AppResult<TempFile> {
        let ext = self
            .classifier
            .direct_media_extension(&request.url)
            .unwrap_or(self.config.video_container.as_str())
            .to_string();
        let mut temp = TempFile::allocate(&self.config.temp_dir(), request.kind.label(), &ext)?;

        log::info!("HTTP direct download: {} -> {}", request.url, temp.path().display());
        let started = Instant::now();

        let downloaded = self.fetch_into(request, &temp, &progress_tx).await?;
        temp.validate("")?;

        log::info!(
            "HTTP download complete: {} ({:.2} MB in {:.1}s)",
            temp.path().display(),
            downloaded as f64 / (1024.0 * 1024.0),
            started.elapsed().as_secs_f64()
        );
        Ok(temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn source() -> HttpSource {
        HttpSource::new(Arc::new(AppConfig::default())).unwrap()
    }

    fn video(s: &str) -> DownloadRequest {
        DownloadRequest::video(Url::parse(s).unwrap())
    }

    #[test]
    fn test_supports_direct_containers() {
        let source = source();
        assert!(source.supports(&video("https://cdn.example.com/video.mp4")));
        assert!(source.supports(&video("https://cdn.example.com/video.webm?x=1")));
        assert!(source.supports(&video("https://cdn.example.com/video.MKV")));
    }

    #[test]
    fn test_rejects_pages_and_audio() {
        let source = source();
        assert!(!source.supports(&video("https://example.com/page")));
        assert!(!source.supports(&video("https://www.youtube.com/watch?v=abc")));
        assert!(!source.supports(&video("https://example.com/audio.flac")));
        assert!(!source.supports(&DownloadRequest::audio(
            Url::parse("https://cdn.example.com/video.mp4").unwrap(),
            "mp3"
        )));
    }
}
