use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use vidfetch::cli::{Cli, Commands};
use vidfetch::core::probe::probe_toolchain;
use vidfetch::core::validation::{validate_audio_format, validate_http_url};
use vidfetch::core::web_server::start_web_server;
use vidfetch::core::{init_logger, AppConfig};
use vidfetch::download::VideoService;

/// Main entry point
///
/// Loads configuration, initializes logging, probes the external tools
/// (fatal on failure) and dispatches to the selected subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logger(&config.log_level, config.log_file.as_deref())?;
    let config = Arc::new(config);

    let toolchain = probe_toolchain(&config)
        .await
        .context("External tool check failed, refusing to start")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            log::info!(
                "Starting vidfetch {} (extractor {})",
                env!("CARGO_PKG_VERSION"),
                toolchain.extractor_version
            );
            let service = Arc::new(VideoService::new(Arc::clone(&config))?);
            start_web_server(&config, service).await?;
        }
        Commands::Info { url, json } => {
            let service = VideoService::new(Arc::clone(&config))?;
            let url = validate_http_url(&url)?;
            let info = service.extract_info(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{} ({}s)", info.title, info.duration);
                if let Some(thumbnail) = &info.thumbnail {
                    println!("thumbnail: {}", thumbnail);
                }
                for format in &info.formats {
                    println!(
                        "  {:<10} {:<6} {:<12} {}",
                        format.format_id,
                        format.ext,
                        format.resolution,
                        format.filesize.map_or_else(|| "-".to_string(), |s| s.to_string())
                    );
                }
            }
        }
        Commands::Download { url, audio, output } => {
            let service = VideoService::new(Arc::clone(&config))?;
            let url = validate_http_url(&url)?;
            let (file, base) = match audio {
                Some(format) => {
                    let format = validate_audio_format(&format, &config)?;
                    (service.download_audio(&url, &format).await?, "audio")
                }
                None => (service.download_video(&url).await?, "video"),
            };
            let dest = output.unwrap_or_else(|| {
                PathBuf::from(format!("{}.{}", base, file.extension().unwrap_or_else(|| "bin".to_string())))
            });
            let size = file.len();
            let saved = file.persist(&dest)?;
            println!("Saved {} ({} bytes)", saved.display(), size);
        }
        Commands::Probe => {
            println!("extractor: {}", toolchain.extractor_version);
            match &toolchain.js_runtime_version {
                Some(version) => println!("script runtime: {}", version),
                None => println!("script runtime: disabled"),
            }
        }
    }

    Ok(())
}
