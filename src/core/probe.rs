//! Startup availability checks for external tools
//!
//! The service refuses to start when the extractor (or the configured script
//! runtime) cannot be executed, instead of failing on the first request.

use std::time::Duration;

use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::process::{run_command, Capture, CommandLine};
use crate::core::utils::truncate_for_log;

/// Versions reported by the probed tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub extractor_version: String,
    /// `None` when no script runtime is configured
    pub js_runtime_version: Option<String>,
}

/// Runs `program args...` and returns the first non-empty output line.
///
/// Spawn failure, timeout, non-zero exit or empty output all map to
/// [`AppError::Unavailable`].
pub async fn probe_tool(program: &str, args: &[&str], timeout: Duration) -> AppResult<String> {
    let command = CommandLine::new(program).args(args.iter().copied());
    let unavailable = |reason: String| AppError::Unavailable {
        tool: program.to_string(),
        reason,
    };

    let output = run_command(&command, timeout, Capture::Tail { max_lines: 20 }, None)
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    if output.timed_out {
        return Err(unavailable(format!("no answer within {}s", timeout.as_secs())));
    }
    if !output.success {
        return Err(unavailable(format!(
            "exit code {:?}: {}",
            output.exit_code,
            truncate_for_log(&output.tail(3), 200)
        )));
    }

    output
        .lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or_else(|| unavailable("empty version output".to_string()))
}

/// Probes the extractor and, when configured, the script runtime
pub async fn probe_toolchain(config: &AppConfig) -> AppResult<Toolchain> {
    let extractor_version = probe_tool(&config.extractor_path, &["--version"], config.probe_timeout()).await?;
    log::info!("{} version: {}", config.extractor_path, extractor_version);

    let js_runtime_version = match config.js_runtime_binary() {
        Some(runtime) => {
            let version = probe_tool(runtime, &["--version"], config.probe_timeout()).await?;
            log::info!("{} version: {}", runtime, version);
            Some(version)
        }
        None => {
            log::info!("No script runtime configured, skipping probe");
            None
        }
    };

    Ok(Toolchain {
        extractor_version,
        js_runtime_version,
    })
}
