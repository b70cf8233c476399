//! vidfetch - HTTP service for video metadata and downloads backed by yt-dlp
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process execution, tool probing, HTTP server
//! - `download`: URL classification, metadata extraction, format ranking,
//!   download sources and temp-file lifecycle

pub mod cli;
pub mod core;
pub mod download;

// Re-export commonly used types for convenience
pub use crate::core::{AppConfig, AppError, AppResult};
pub use crate::download::{Format, TempFile, VideoInfo, VideoService};
