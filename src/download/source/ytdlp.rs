//! YtDlpSource: downloads through the yt-dlp extractor.
//!
//! Builds the fetch-mode command line, runs it through the process runner
//! with the download timeout, and checks the post-conditions in order:
//! not timed out, exit code zero, output present, output non-empty.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::process::{run_command, Capture, CommandLine, LineSink};
use crate::download::classifier::DomainClassifier;
use crate::download::progress::{parse_progress, ProgressSender};
use crate::download::source::{DownloadRequest, DownloadSource};
use crate::download::temp_file::TempFile;
use crate::download::types::MediaKind;

/// Output lines attached to download errors
const ERROR_TAIL_LINES: usize = 20;

pub struct YtDlpSource {
    config: Arc<AppConfig>,
    classifier: DomainClassifier,
}

impl YtDlpSource {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let classifier = DomainClassifier::from_config(&config);
        Self { config, classifier }
    }

    fn runtime_arg(&self, request: &DownloadRequest) -> Option<String> {
        if self.classifier.needs_script_runtime(&request.url) {
            self.config.js_runtime_arg()
        } else {
            None
        }
    }

    /// Builds the fetch-mode command writing to `output`
    pub fn build_command(&self, request: &DownloadRequest, output: &str) -> CommandLine {
        let runtime = self.runtime_arg(request);
        let mut command =
            CommandLine::new(&self.config.extractor_path).args(["--no-check-certificates", "--no-warnings", "--no-playlist"]);

        match &request.kind {
            MediaKind::Video => {
                command = command.args(["-o", output, "--force-overwrites", "--newline"]);
                if let Some(runtime) = runtime {
                    let selector = format!("best[ext={}]/best", self.config.video_container);
                    command = command.args(["--js-runtimes".to_string(), runtime, "-f".to_string(), selector]);
                }
            }
            MediaKind::Audio { format } => {
                command = command.args([
                    "-x",
                    "--audio-format",
                    format.as_str(),
                    "--audio-quality",
                    "0",
                    "-o",
                    output,
                    "--force-overwrites",
                    "--newline",
                ]);
                if let Some(runtime) = runtime {
                    command = command.args(["--js-runtimes".to_string(), runtime]);
                }
            }
        }

        command.arg(request.url.as_str())
    }

    fn output_extension<'a>(&'a self, kind: &'a MediaKind) -> &'a str {
        match kind {
            MediaKind::Video => &self.config.video_container,
            MediaKind::Audio { format } => format,
        }
    }
}

#[async_trait]
impl DownloadSource for YtDlpSource {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn supports(&self, request: &DownloadRequest) -> bool {
        matches!(request.url.scheme(), "http" | "https")
    }

    async fn download(&self, request: &DownloadRequest, progress_tx: ProgressSender) -> AppResult<TempFile> {
        let mut temp = TempFile::allocate(
            &self.config.temp_dir(),
            request.kind.label(),
            self.output_extension(&request.kind),
        )?;
        let output_path = temp.path().to_string_lossy().into_owned();
        let command = self.build_command(request, &output_path);
        let timeout = self.config.download_timeout();

        log::info!("yt-dlp {} download: {} -> {}", request.kind.label(), request.url, output_path);

        let sink: LineSink = Arc::new(move |line: &str| {
            if let Some(progress) = parse_progress(line) {
                // Receiver may already be gone; progress is best-effort
                let _ = progress_tx.send(progress);
            }
        });

        let output = run_command(
            &command,
            timeout,
            Capture::Tail {
                max_lines: self.config.output_tail_lines,
            },
            Some(sink),
        )
        .await?;

        let tail = output.tail(ERROR_TAIL_LINES);
        if output.timed_out {
            return Err(AppError::Timeout {
                operation: "extractor download",
                after: timeout,
                output_tail: tail,
            });
        }
        if !output.success {
            return Err(AppError::NonZeroExit {
                code: output.exit_code,
                output_tail: tail,
            });
        }

        temp.validate(&tail)?;
        log::info!(
            "yt-dlp download complete: {} ({} bytes in {:.1}s)",
            temp.path().display(),
            temp.len(),
            output.elapsed.as_secs_f64()
        );
        Ok(temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn source() -> YtDlpSource {
        YtDlpSource::new(Arc::new(AppConfig::default()))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_video_command_for_script_runtime_host() {
        let cmd = source().build_command(&DownloadRequest::video(url("https://youtu.be/abc")), "/tmp/out.mp4");
        assert_eq!(
            cmd.args,
            vec![
                "--no-check-certificates",
                "--no-warnings",
                "--no-playlist",
                "-o",
                "/tmp/out.mp4",
                "--force-overwrites",
                "--newline",
                "--js-runtimes",
                "node",
                "-f",
                "best[ext=mp4]/best",
                "https://youtu.be/abc",
            ]
        );
    }

    #[test]
    fn test_video_command_for_other_host() {
        let cmd = source().build_command(&DownloadRequest::video(url("https://vimeo.com/1")), "/tmp/out.mp4");
        assert!(!cmd.has_arg("--js-runtimes"));
        assert!(!cmd.has_arg("-f"));
        assert_eq!(cmd.arg_value("-o"), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_audio_command() {
        let cmd = source().build_command(
            &DownloadRequest::audio(url("https://www.youtube.com/watch?v=abc"), "opus"),
            "/tmp/out.opus",
        );
        assert!(cmd.has_arg("-x"));
        assert_eq!(cmd.arg_value("--audio-format"), Some("opus"));
        assert_eq!(cmd.arg_value("--audio-quality"), Some("0"));
        assert_eq!(cmd.arg_value("--js-runtimes"), Some("node"));
        assert!(!cmd.has_arg("-f"));

        let plain = source().build_command(&DownloadRequest::audio(url("https://soundcloud.com/a/b"), "mp3"), "/tmp/o");
        assert!(!plain.has_arg("--js-runtimes"));
    }

    #[test]
    fn test_supports_only_http_schemes() {
        let s = source();
        assert!(s.supports(&DownloadRequest::video(url("https://example.com/page"))));
        assert!(!s.supports(&DownloadRequest::video(url("ftp://example.com/clip.mp4"))));
    }
}
