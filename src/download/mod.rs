//! Download management: classification, metadata, sources and temp files

pub mod classifier;
pub mod formats;
pub mod metadata;
pub mod orchestrator;
pub mod progress;
pub mod source;
pub mod temp_file;
pub mod types;

// Re-exports for convenience
pub use classifier::DomainClassifier;
pub use metadata::MetadataExtractor;
pub use orchestrator::{Downloader, VideoService};
pub use temp_file::TempFile;
pub use types::{Format, MediaKind, VideoInfo};
