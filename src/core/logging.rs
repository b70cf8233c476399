//! Logging initialization and structured operation events
//!
//! This module provides:
//! - Logger initialization (console + optional file)
//! - `log_operation` for one-line operation outcome events

use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use crate::core::error::{AppError, AppResult};

/// Log target for operation outcome events
pub const EVENTS_TARGET: &str = "vidfetch::events";

/// Parses a textual level, falling back to `Info` for unknown values
pub fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}

/// Initialize logger for console output and, when a path is given, a log file
pub fn init_logger(level: &str, log_file_path: Option<&Path>) -> AppResult<()> {
    let level = parse_level(level);
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path)
            .map_err(|e| AppError::Config(format!("Failed to create log file {}: {}", path.display(), e)))?;
        loggers.push(WriteLogger::new(level, Config::default(), log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| AppError::Config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Emits a single structured event describing how an operation ended
///
/// Produces `operation=<op> outcome=<ok|kind> duration_ms=<n> <detail>` on the
/// `vidfetch::events` target. Failures are logged at warn level.
pub fn log_operation<T>(operation: &str, detail: &str, started: Instant, result: &AppResult<T>) {
    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(_) => log::info!(
            target: EVENTS_TARGET,
            "operation={} outcome=ok duration_ms={} {}",
            operation,
            duration_ms,
            detail
        ),
        Err(e) => log::warn!(
            target: EVENTS_TARGET,
            "operation={} outcome={} duration_ms={} {} error=\"{}\"",
            operation,
            e.kind(),
            duration_ms,
            detail,
            e
        ),
    }
}
