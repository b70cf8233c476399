use serde::{Deserialize, Serialize};

/// Normalized metadata returned by `/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub title: String,
    /// Seconds, 0 when unknown
    pub duration: u64,
    pub thumbnail: Option<String>,
    pub formats: Vec<Format>,
}

/// One downloadable rendition, after filtering and ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub format_id: String,
    pub ext: String,
    /// `"1920x1080"`, `"720p"`, `"audio only"`, `"128kbps"`, ...
    pub resolution: String,
    pub filesize: Option<u64>,
    pub audio_only: bool,
}

/// What a download request asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    /// Extract and transcode audio to the given format
    Audio { format: String },
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio { .. } => "audio",
        }
    }
}
