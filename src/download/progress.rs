//! Download progress events
//!
//! yt-dlp prints `[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10`
//! lines when run with `--newline`. They are parsed into [`SourceProgress`]
//! events and reported through the log. Progress never affects control flow.

use tokio::sync::mpsc;

/// Progress information emitted during download.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProgress {
    /// Download progress percentage (0-100), `None` when the total is unknown
    pub percent: Option<u8>,
    /// Download speed in bytes per second
    pub speed_bytes_sec: Option<f64>,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<u64>,
    /// Bytes downloaded so far
    pub downloaded_bytes: Option<u64>,
    /// Total bytes expected
    pub total_bytes: Option<u64>,
}

pub type ProgressSender = mpsc::UnboundedSender<SourceProgress>;

/// Parses progress from a yt-dlp output line
pub fn parse_progress(line: &str) -> Option<SourceProgress> {
    if !line.contains("[download]") || !line.contains('%') {
        return None;
    }

    let mut percent = None;
    let mut speed_bytes_sec = None;
    let mut eta_seconds = None;
    let mut total_bytes = None;

    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        let next = parts.get(i + 1).copied();
        if part.ends_with('%') {
            if let Ok(p) = part.trim_end_matches('%').parse::<f32>() {
                percent = Some(p.clamp(0.0, 100.0) as u8);
            }
        }
        match (*part, next) {
            // "of ~10.00MiB" is an estimate, still useful for logs
            ("of", Some(size)) => total_bytes = parse_size(size.trim_start_matches('~')),
            ("at", Some(speed)) => speed_bytes_sec = parse_size(speed).map(|b| b as f64),
            ("ETA", Some(eta)) => eta_seconds = parse_eta(eta),
            _ => {}
        }
    }

    let percent = percent?;
    let downloaded_bytes = total_bytes.map(|total| (total as f64 * (f64::from(percent) / 100.0)) as u64);

    Some(SourceProgress {
        percent: Some(percent),
        speed_bytes_sec,
        eta_seconds,
        downloaded_bytes,
        total_bytes,
    })
}

/// Parses sizes like "10.00MiB", "500.00KiB/s" or "1.2GiB" into bytes
pub fn parse_size(size_str: &str) -> Option<u64> {
    let size_str = size_str.trim_end_matches("/s");
    let units: [(&str, f64); 4] = [
        ("GiB", 1024.0 * 1024.0 * 1024.0),
        ("MiB", 1024.0 * 1024.0),
        ("KiB", 1024.0),
        ("B", 1.0),
    ];
    units.iter().find_map(|(suffix, factor)| {
        size_str
            .strip_suffix(suffix)
            .and_then(|n| n.parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| (n * factor) as u64)
    })
}

/// Parses ETA strings "00:10", "1:23" or "1:02:03" into seconds
pub fn parse_eta(eta_str: &str) -> Option<u64> {
    eta_str
        .split(':')
        .try_fold((0u64, 0usize), |(acc, n), part| {
            part.parse::<u64>().ok().map(|v| (acc * 60 + v, n + 1))
        })
        .filter(|(_, n)| (2..=3).contains(n))
        .map(|(secs, _)| secs)
}

/// Turns a stream of progress events into throttled log lines
#[derive(Debug)]
pub struct ProgressReporter {
    label: String,
    step: u8,
    next_percent: u8,
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>, step: u8) -> Self {
        Self {
            label: label.into(),
            step: step.max(1),
            next_percent: 0,
        }
    }

    /// Records an event; returns true when it was logged at info level
    pub fn observe(&mut self, progress: &SourceProgress) -> bool {
        match progress.percent {
            Some(percent) if percent >= self.next_percent => {
                log::info!(
                    "{}: {}% ({} of {} bytes, eta {:?}s)",
                    self.label,
                    percent,
                    progress.downloaded_bytes.unwrap_or(0),
                    progress.total_bytes.map_or_else(|| "?".to_string(), |t| t.to_string()),
                    progress.eta_seconds
                );
                self.next_percent = (percent / self.step).saturating_add(1).saturating_mul(self.step);
                true
            }
            _ => {
                log::debug!(
                    "{}: {} bytes received",
                    self.label,
                    progress.downloaded_bytes.unwrap_or(0)
                );
                false
            }
        }
    }
}

/// Spawns a task that logs events until every sender is dropped
pub fn spawn_progress_logger(label: impl Into<String>) -> (ProgressSender, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SourceProgress>();
    let mut reporter = ProgressReporter::new(label, 10);
    let handle = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            reporter.observe(&progress);
        }
    });
    (tx, handle)
}
