use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vidfetch")]
#[command(author, version, about = "HTTP service for video metadata and downloads backed by yt-dlp", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./vidfetch.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Print metadata and formats for a URL
    Info {
        url: String,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download a URL to a local file
    Download {
        url: String,

        /// Extract audio in this format instead of downloading video
        #[arg(long, value_name = "FORMAT")]
        audio: Option<String>,

        /// Destination path (defaults to video.<ext> / audio.<ext> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the extractor and script runtime are usable
    Probe,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["vidfetch"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_download_audio_args() {
        let cli = Cli::try_parse_from([
            "vidfetch",
            "download",
            "https://youtu.be/abc",
            "--audio",
            "opus",
            "-o",
            "/tmp/a.opus",
            "--config",
            "x.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert_eq!(
            cli.command,
            Some(Commands::Download {
                url: "https://youtu.be/abc".to_string(),
                audio: Some("opus".to_string()),
                output: Some(PathBuf::from("/tmp/a.opus")),
            })
        );
    }

    #[test]
    fn test_info_requires_url() {
        assert!(Cli::try_parse_from(["vidfetch", "info"]).is_err());
    }
}
