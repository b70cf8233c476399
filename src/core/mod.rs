//! Core utilities, configuration, process execution, and the HTTP server

pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod process;
pub mod utils;
pub mod validation;
pub mod web_server;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use logging::init_logger;
