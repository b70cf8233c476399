use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Centralized error type for the service
///
/// Every failure the extractor pipeline can produce is one of these variants.
/// `kind()` gives a stable category string used in logs and HTTP error bodies.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required external tool is missing or broken (startup-fatal)
    #[error("{tool} is unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    /// The external program could not be started at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The extractor printed something that is not a metadata object
    #[error("Invalid response from extractor: {excerpt}")]
    MalformedOutput { excerpt: String },

    /// The operation ran past its deadline and was killed
    #[error("{operation} timed out after {}s{}", .after.as_secs(), tail_suffix(.output_tail))]
    Timeout {
        operation: &'static str,
        after: Duration,
        output_tail: String,
    },

    /// The extractor finished with a non-zero exit status
    #[error("extractor exited with code {}{}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()), tail_suffix(.output_tail))]
    NonZeroExit { code: Option<i32>, output_tail: String },

    /// The download finished but produced no usable file
    #[error("download produced no data at {}{}", .path.display(), tail_suffix(.output_tail))]
    EmptyOrMissingFile { path: PathBuf, output_tail: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

fn tail_suffix(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!(": {}", tail)
    }
}

impl AppError {
    /// Stable category name for logs and API responses
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unavailable { .. } => "unavailable",
            AppError::Spawn { .. } => "spawn",
            AppError::MalformedOutput { .. } => "malformed_output",
            AppError::Timeout { .. } => "timeout",
            AppError::NonZeroExit { .. } => "non_zero_exit",
            AppError::EmptyOrMissingFile { .. } => "empty_file",
            AppError::Io(_) => "io",
            AppError::Http(_) | AppError::HttpStatus(_) => "http",
            AppError::Validation(_) => "validation",
            AppError::Config(_) => "config",
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Validation(format!("invalid URL: {}", err))
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_includes_tail() {
        let err = AppError::Timeout {
            operation: "video download",
            after: Duration::from_secs(5),
            output_tail: "[download] 10.0%".to_string(),
        };
        assert_eq!(err.to_string(), "video download timed out after 5s: [download] 10.0%");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_non_zero_exit_without_tail() {
        let err = AppError::NonZeroExit {
            code: Some(1),
            output_tail: String::new(),
        };
        assert_eq!(err.to_string(), "extractor exited with code 1");

        let killed = AppError::NonZeroExit {
            code: None,
            output_tail: String::new(),
        };
        assert_eq!(killed.to_string(), "extractor exited with code none");
    }

    #[test]
    fn test_url_parse_error_is_validation() {
        let err: AppError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind(), "validation");
    }
}
