//! Metadata extraction via `yt-dlp --dump-json`
//!
//! The extractor prints exactly one JSON object on success. Anything else
//! (an `ERROR:` line, an HTML error page from a proxy) is reported as
//! [`AppError::MalformedOutput`] with a short excerpt. Fields are read one by
//! one with defaults so a partial dump still yields a usable [`VideoInfo`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use url::Url;

use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::logging::log_operation;
use crate::core::process::{run_command, Capture, CommandLine};
use crate::core::utils::truncate_chars;
use crate::download::classifier::DomainClassifier;
use crate::download::formats::select_formats;
use crate::download::types::{Format, VideoInfo};

pub const DEFAULT_TITLE: &str = "Unknown Title";

/// Characters of unexpected output kept in error messages
pub const EXCERPT_CHARS: usize = 200;

/// Output lines attached to timeout errors
const TIMEOUT_TAIL_LINES: usize = 5;

fn excerpt(text: &str) -> String {
    truncate_chars(text, EXCERPT_CHARS).to_string()
}

/// Parses a metadata dump into a [`VideoInfo`].
///
/// Only the leading JSON value is read; trailing output is ignored.
pub fn parse_video_info(output: &str, max_formats: usize) -> AppResult<VideoInfo> {
    let trimmed = output.trim();
    if !trimmed.starts_with('{') {
        return Err(AppError::MalformedOutput {
            excerpt: excerpt(trimmed),
        });
    }

    let value = match serde_json::Deserializer::from_str(trimmed).into_iter::<Value>().next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            return Err(AppError::MalformedOutput {
                excerpt: format!("{} ({})", excerpt(trimmed), e),
            })
        }
        None => {
            return Err(AppError::MalformedOutput {
                excerpt: excerpt(trimmed),
            })
        }
    };

    let Value::Object(map) = &value else {
        return Err(AppError::MalformedOutput {
            excerpt: excerpt(trimmed),
        });
    };

    let title = map
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    let duration = map
        .get("duration")
        .and_then(|d| d.as_u64().or_else(|| d.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64)))
        .unwrap_or(0);

    let thumbnail = map
        .get("thumbnail")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let formats = map
        .get("formats")
        .and_then(Value::as_array)
        .map(|raw| select_formats(raw, max_formats))
        .unwrap_or_default();

    Ok(VideoInfo {
        title,
        duration,
        thumbnail,
        formats,
    })
}

/// Runs the extractor in metadata mode
pub struct MetadataExtractor {
    config: Arc<AppConfig>,
    classifier: DomainClassifier,
}

impl MetadataExtractor {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let classifier = DomainClassifier::from_config(&config);
        Self { config, classifier }
    }

    pub fn build_command(&self, url: &Url) -> CommandLine {
        let mut command = CommandLine::new(&self.config.extractor_path).args([
            "--dump-json",
            "--no-warnings",
            "--quiet",
            "--no-playlist",
        ]);
        if self.classifier.needs_script_runtime(url) {
            if let Some(runtime) = self.config.js_runtime_arg() {
                command = command.args(["--js-runtimes".to_string(), runtime]);
            }
        }
        command.arg(url.as_str())
    }

    pub async fn extract_info(&self, url: &Url) -> AppResult<VideoInfo> {
        let started = Instant::now();
        let result = self.run_extraction(url).await;
        log_operation("extract_info", &format!("url={}", url), started, &result);
        result
    }

    /// Same derivation as [`Self::extract_info`], formats only
    pub async fn get_formats(&self, url: &Url) -> AppResult<Vec<Format>> {
        Ok(self.extract_info(url).await?.formats)
    }

    async fn run_extraction(&self, url: &Url) -> AppResult<VideoInfo> {
        let command = self.build_command(url);
        let timeout = self.config.metadata_timeout();
        let output = run_command(
            &command,
            timeout,
            Capture::All {
                max_bytes: self.config.metadata_max_bytes,
            },
            None,
        )
        .await?;

        if output.timed_out {
            return Err(AppError::Timeout {
                operation: "metadata extraction",
                after: timeout,
                output_tail: output.tail(TIMEOUT_TAIL_LINES),
            });
        }
        if output.truncated {
            log::warn!(
                "Metadata output for {} exceeded {} bytes and was cut",
                url,
                self.config.metadata_max_bytes
            );
        }

        let info = parse_video_info(&output.text(), self.config.max_formats)?;
        if !output.success {
            log::warn!(
                "Extractor exited with {:?} for {} but produced metadata, using it",
                output.exit_code,
                url
            );
        }

        log::info!(
            "Extracted metadata for {}: title={:?} duration={}s formats={}",
            url,
            info.title,
            info.duration,
            info.formats.len()
        );
        Ok(info)
    }
}
