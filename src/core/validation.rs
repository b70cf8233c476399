//! Request input validation
//!
//! - URL validation (must start with `http`, parse, and use http/https)
//! - Audio format validation against the configured allow-list

use thiserror::Error;
use url::Url;

use crate::core::config::AppConfig;
use crate::core::error::AppError;

/// Validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Empty or missing `url` parameter
    #[error("url parameter is required")]
    MissingUrl,

    /// Invalid URL format or scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Audio format outside the allow-list
    #[error("Unsupported audio format '{format}' (allowed: {allowed})")]
    UnsupportedAudioFormat { format: String, allowed: String },
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Validates a user-supplied media URL.
///
/// The raw string must start with `http`, parse as an absolute URL, use the
/// http or https scheme and carry a host.
///
/// # Examples
/// ```
/// use vidfetch::core::validation::validate_http_url;
///
/// assert!(validate_http_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
/// assert!(validate_http_url("ftp://example.com/video.mp4").is_err());
/// assert!(validate_http_url("httpx://example.com").is_err());
/// ```
pub fn validate_http_url(raw: &str) -> Result<Url, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingUrl);
    }
    if !raw.starts_with("http") {
        return Err(ValidationError::InvalidUrl(format!("{} (must start with http)", raw)));
    }

    let parsed = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl(format!("{} ({})", raw, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidUrl(format!(
            "{} (invalid scheme: {})",
            raw,
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(ValidationError::InvalidUrl(format!("{} (no host)", raw))),
    }
}

/// Validates and normalizes (lowercases) an audio format name
pub fn validate_audio_format(format: &str, config: &AppConfig) -> Result<String, ValidationError> {
    let normalized = format.trim().to_ascii_lowercase();
    if config.is_allowed_audio_format(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::UnsupportedAudioFormat {
            format: format.to_string(),
            allowed: config.audio_formats.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url_valid() {
        let valid_urls = vec![
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "http://example.com/clip.mp4",
            "https://cdn.example.org/a/b.webm?token=1",
            "  https://vimeo.com/12345  ",
        ];

        for url in valid_urls {
            assert!(validate_http_url(url).is_ok(), "Failed for: {}", url);
        }
    }

    #[test]
    fn test_validate_http_url_invalid() {
        let invalid_urls = vec![
            "ftp://example.com/video.mp4",
            "file:///etc/passwd",
            "javascript:alert('xss')",
            "example.com/video.mp4",
            "httpx://example.com",
            "http//broken",
            "http:",
        ];

        for url in invalid_urls {
            assert!(validate_http_url(url).is_err(), "Should fail for: {}", url);
        }
    }

    #[test]
    fn test_validate_http_url_missing() {
        assert_eq!(validate_http_url(""), Err(ValidationError::MissingUrl));
        assert_eq!(validate_http_url("   "), Err(ValidationError::MissingUrl));
    }

    #[test]
    fn test_validate_audio_format() {
        let config = AppConfig::default();
        assert_eq!(validate_audio_format("MP3", &config).unwrap(), "mp3");
        assert_eq!(validate_audio_format("opus", &config).unwrap(), "opus");

        let err = validate_audio_format("exe", &config).unwrap_err();
        assert!(err.to_string().contains("exe"));
        assert!(err.to_string().contains("mp3"));
    }

    #[test]
    fn test_validation_error_maps_to_app_error() {
        let err: AppError = ValidationError::MissingUrl.into();
        assert_eq!(err.kind(), "validation");
    }
}
