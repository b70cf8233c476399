//! Format filtering and ranking
//!
//! [`select_formats`] turns the raw `formats` array of an extractor dump into
//! the short, ordered list served to clients. Audio renditions come first,
//! then video renditions from lowest to highest quality tier.

use serde_json::Value;

use crate::download::types::Format;

/// Format ids with this prefix are storyboard (thumbnail sprite) tracks
pub const STORYBOARD_PREFIX: &str = "sb";

pub const AUDIO_ONLY_LABEL: &str = "audio only";
pub const UNKNOWN_LABEL: &str = "unknown";

/// Ordinal used for any video label outside the tier table
pub const UNRANKED_TIER: u8 = 9;

const TIER_TABLE: &[(u32, u8)] = &[
    (144, 1),
    (240, 2),
    (360, 3),
    (480, 4),
    (720, 5),
    (1080, 6),
    (1440, 7),
    (2160, 8),
];

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn u64_field(raw: &Value, key: &str) -> Option<u64> {
    let value = raw.get(key)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
}

/// Audio-only when the video codec is `none`, or when no video codec is
/// reported at all and the record carries audio evidence.
pub fn is_audio_only(raw: &Value) -> bool {
    match str_field(raw, "vcodec") {
        Some(vcodec) => vcodec.eq_ignore_ascii_case("none"),
        None => {
            let has_abr = raw.get("abr").and_then(Value::as_f64).is_some_and(|abr| abr > 0.0);
            let has_acodec = str_field(raw, "acodec").is_some_and(|a| !a.eq_ignore_ascii_case("none"));
            let labelled_audio = str_field(raw, "resolution").is_some_and(|r| r.eq_ignore_ascii_case(AUDIO_ONLY_LABEL));
            has_abr || has_acodec || labelled_audio
        }
    }
}

fn resolution_label(raw: &Value, audio_only: bool) -> String {
    if audio_only {
        return match raw.get("abr").and_then(Value::as_f64).filter(|abr| abr.is_finite() && *abr > 0.0) {
            Some(abr) => format!("{}kbps", abr.round() as u64),
            None => AUDIO_ONLY_LABEL.to_string(),
        };
    }
    str_field(raw, "resolution")
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

/// Vertical pixel count encoded in a label (`720p`, `720p60`, `1280x720`)
pub fn label_height(label: &str) -> Option<u32> {
    let label = label.trim().to_ascii_lowercase();
    if let Some((_, height)) = label.split_once('x') {
        return height.parse().ok();
    }
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || !label[digits.len()..].starts_with('p') {
        return None;
    }
    digits.parse().ok()
}

/// Sort ordinal: 0 for audio, 1..=8 for the tier table, 9 otherwise
pub fn quality_tier(format: &Format) -> u8 {
    if format.audio_only {
        return 0;
    }
    label_height(&format.resolution)
        .and_then(|h| TIER_TABLE.iter().find(|(height, _)| *height == h).map(|(_, tier)| *tier))
        .unwrap_or(UNRANKED_TIER)
}

fn normalize(raw: &Value) -> Option<Format> {
    let ext = str_field(raw, "ext")?;
    let format_id = str_field(raw, "format_id").unwrap_or(UNKNOWN_LABEL);
    if format_id.starts_with(STORYBOARD_PREFIX) {
        return None;
    }

    let audio_only = is_audio_only(raw);
    let resolution = resolution_label(raw, audio_only);
    if resolution == UNKNOWN_LABEL {
        return None;
    }

    Some(Format {
        format_id: format_id.to_string(),
        ext: ext.to_string(),
        resolution,
        filesize: u64_field(raw, "filesize").or_else(|| u64_field(raw, "filesize_approx")),
        audio_only,
    })
}

/// Filters, classifies, ranks and caps raw extractor format records
pub fn select_formats(raw_formats: &[Value], max_formats: usize) -> Vec<Format> {
    let mut formats: Vec<Format> = raw_formats.iter().filter_map(normalize).collect();
    // Vec::sort_by_key is stable, equal tiers keep extractor order
    formats.sort_by_key(quality_tier);
    formats.truncate(max_formats);
    formats
}
