//! Service configuration
//!
//! All policy knobs live in one immutable [`AppConfig`] that is loaded once at
//! startup and shared behind an `Arc`. Sources are layered with figment:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`, or `vidfetch.toml` when present)
//! 3. `VIDFETCH_*` environment variables
//! 4. the legacy `YTDL_BIN` variable for the extractor binary

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "vidfetch.toml";

/// Prefix for environment overrides (`VIDFETCH_PORT=9000`)
pub const ENV_PREFIX: &str = "VIDFETCH_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// yt-dlp executable (name on PATH or absolute path)
    pub extractor_path: String,
    /// Script runtime handed to yt-dlp via `--js-runtimes`; empty disables it
    pub js_runtime: String,
    /// Explicit runtime binary, passed as `<runtime>:<path>`
    pub js_runtime_path: Option<String>,
    /// Hosts (and their subdomains) that need the script runtime
    pub script_runtime_domains: Vec<String>,
    /// URL path extensions fetched directly over HTTP
    pub direct_media_extensions: Vec<String>,
    /// Preferred container when a format filter is applied
    pub video_container: String,
    /// Audio formats accepted by `/download/audio`
    pub audio_formats: Vec<String>,
    pub max_formats: usize,

    pub probe_timeout_secs: u64,
    pub metadata_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// Upper bound on captured metadata output
    pub metadata_max_bytes: usize,
    /// Output lines kept for download diagnostics
    pub output_tail_lines: usize,

    pub http_connect_timeout_secs: u64,
    pub http_read_timeout_secs: u64,
    pub user_agent: String,

    /// Where temp outputs are allocated; system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            extractor_path: "yt-dlp".to_string(),
            js_runtime: "node".to_string(),
            js_runtime_path: None,
            script_runtime_domains: strings(&["youtube.com", "youtu.be", "youtube-nocookie.com"]),
            direct_media_extensions: strings(&["mp4", "webm", "mkv"]),
            video_container: "mp4".to_string(),
            audio_formats: strings(&["mp3", "m4a", "aac", "opus", "vorbis", "flac", "wav", "alac"]),
            max_formats: 10,
            probe_timeout_secs: 10,
            metadata_timeout_secs: 120,
            download_timeout_secs: 600,
            metadata_max_bytes: 16 * 1024 * 1024,
            output_tail_lines: 200,
            http_connect_timeout_secs: 30,
            http_read_timeout_secs: 120,
            user_agent: format!("vidfetch/{}", env!("CARGO_PKG_VERSION")),
            temp_dir: None,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl AppConfig {
    /// Builds the layered figment without extracting it
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        match config_file {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Env::raw().only(&["YTDL_BIN"]).map(|_| "extractor_path".into()))
    }

    /// Loads and validates the configuration
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(AppError::Config(format!("config file {} not found", path.display())));
            }
        }
        let config: AppConfig = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.extractor_path.trim().is_empty() {
            return Err(AppError::Config("extractor_path must not be empty".to_string()));
        }
        if self.max_formats == 0 {
            return Err(AppError::Config("max_formats must be at least 1".to_string()));
        }
        for (name, secs) in [
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("metadata_timeout_secs", self.metadata_timeout_secs),
            ("download_timeout_secs", self.download_timeout_secs),
            ("http_connect_timeout_secs", self.http_connect_timeout_secs),
            ("http_read_timeout_secs", self.http_read_timeout_secs),
        ] {
            if secs == 0 {
                return Err(AppError::Config(format!("{} must be greater than zero", name)));
            }
        }
        if self.direct_media_extensions.is_empty() {
            return Err(AppError::Config("direct_media_extensions must not be empty".to_string()));
        }
        if self.audio_formats.is_empty() {
            return Err(AppError::Config("audio_formats must not be empty".to_string()));
        }
        if self.output_tail_lines == 0 {
            return Err(AppError::Config("output_tail_lines must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout_secs)
    }

    pub fn http_read_timeout(&self) -> Duration {
        Duration::from_secs(self.http_read_timeout_secs)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// The script runtime is configured (non-empty name)
    pub fn js_runtime_enabled(&self) -> bool {
        !self.js_runtime.trim().is_empty()
    }

    /// Value for yt-dlp's `--js-runtimes` flag, `None` when disabled
    pub fn js_runtime_arg(&self) -> Option<String> {
        if !self.js_runtime_enabled() {
            return None;
        }
        match self.js_runtime_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => Some(format!("{}:{}", self.js_runtime, path)),
            None => Some(self.js_runtime.clone()),
        }
    }

    /// Binary to run when probing the script runtime
    pub fn js_runtime_binary(&self) -> Option<&str> {
        if !self.js_runtime_enabled() {
            return None;
        }
        Some(
            self.js_runtime_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(&self.js_runtime),
        )
    }

    pub fn is_allowed_audio_format(&self, format: &str) -> bool {
        self.audio_formats.iter().any(|f| f.eq_ignore_ascii_case(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_formats, 10);
        assert_eq!(config.metadata_timeout(), Duration::from_secs(120));
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_js_runtime_arg() {
        let mut config = AppConfig::default();
        assert_eq!(config.js_runtime_arg().as_deref(), Some("node"));
        assert_eq!(config.js_runtime_binary(), Some("node"));

        config.js_runtime_path = Some("/usr/bin/node".to_string());
        assert_eq!(config.js_runtime_arg().as_deref(), Some("node:/usr/bin/node"));
        assert_eq!(config.js_runtime_binary(), Some("/usr/bin/node"));

        config.js_runtime = String::new();
        assert_eq!(config.js_runtime_arg(), None);
        assert_eq!(config.js_runtime_binary(), None);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = AppConfig {
            max_formats: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            download_timeout_secs: 0,
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("download_timeout_secs"));
    }

    #[test]
    fn test_layered_sources() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                port = 9000
                max_formats = 5
                direct_media_extensions = ["mp4"]
                "#,
            )?;
            jail.set_env("VIDFETCH_PORT", "9100");
            jail.set_env("YTDL_BIN", "/opt/yt-dlp");

            let config: AppConfig = AppConfig::figment(Some(Path::new("custom.toml"))).extract()?;
            assert_eq!(config.port, 9100);
            assert_eq!(config.max_formats, 5);
            assert_eq!(config.direct_media_extensions, vec!["mp4".to_string()]);
            assert_eq!(config.extractor_path, "/opt/yt-dlp");
            assert_eq!(config.video_container, "mp4");
            Ok(())
        });
    }

    #[test]
    fn test_audio_format_allow_list() {
        let config = AppConfig::default();
        assert!(config.is_allowed_audio_format("mp3"));
        assert!(config.is_allowed_audio_format("FLAC"));
        assert!(!config.is_allowed_audio_format("exe"));
    }
}
