//! Request-scoped temporary media files
//!
//! A [`TempFile`] owns one unique output stem in the temp directory. Dropping
//! it deletes the file and every sidecar the extractor leaves next to it
//! (`.part`, `.ytdl`, pre-merge `.f137.mp4` streams), so failure paths only
//! need to let the handle go out of scope.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::error::{AppError, AppResult};

/// File name prefix for every temp output
pub const TEMP_PREFIX: &str = "vidfetch";

/// Suffixes yt-dlp uses for unfinished work
const PARTIAL_MARKERS: &[&str] = &["part", "ytdl", "temp"];

/// `rest` is the part of a file name after `<stem>.`
fn is_final_output(rest: &str) -> bool {
    if rest.is_empty() || rest.contains("part-Frag") {
        return false;
    }
    rest.split('.').all(|segment| {
        let is_format_stream = segment.len() > 1
            && segment.starts_with('f')
            && segment[1..].chars().all(|c| c.is_ascii_digit() || c == '-');
        !segment.is_empty() && !is_format_stream && !PARTIAL_MARKERS.contains(&segment)
    })
}

#[derive(Debug)]
pub struct TempFile {
    dir: PathBuf,
    stem: String,
    path: PathBuf,
    len: u64,
    keep: bool,
}

impl TempFile {
    /// Reserves a unique path `<dir>/vidfetch-<kind>-<uuid>.<ext>`.
    ///
    /// The file itself is not created; the writer (extractor or fetch loop)
    /// creates it.
    pub fn allocate(dir: &Path, kind: &str, ext: &str) -> AppResult<Self> {
        fs::create_dir_all(dir)?;
        let stem = format!("{}-{}-{}", TEMP_PREFIX, kind, Uuid::new_v4().simple());
        let path = dir.join(format!("{}.{}", stem, ext));
        Ok(Self {
            dir: dir.to_path_buf(),
            stem,
            path,
            len: 0,
            keep: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length recorded by the last successful [`Self::validate`]
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extension of the current path, lowercased
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Adopts a sibling output with the same stem when the exact path is
    /// missing.
    ///
    /// yt-dlp keeps the literal `-o` path and appends the real extension when
    /// it differs, so a transcode of `<stem>.mp3` lands in `<stem>.mp3.mp3`
    /// and a merge of `<stem>.mp4` may land in `<stem>.mp4.mkv`. Partial
    /// downloads and per-format streams (`<stem>.f137.mp4`) are never adopted.
    /// Among several candidates the most recently written one wins.
    pub fn resolve_actual(&mut self) {
        if self.path.exists() {
            return;
        }
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        let prefix = format!("{}.", self.stem);
        let found = entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let meta = e.metadata().ok().filter(|m| m.is_file())?;
                let name = e.file_name().into_string().ok()?;
                let rest = name.strip_prefix(&prefix)?;
                is_final_output(rest).then(|| (meta.modified().ok(), e.path()))
            })
            .max();
        if let Some((_, found)) = found {
            log::debug!("Adopting extractor output {} for {}", found.display(), self.path.display());
            self.path = found;
        }
    }

    /// Checks that the output exists and is non-empty, recording its length
    pub fn validate(&mut self, output_tail: &str) -> AppResult<()> {
        self.resolve_actual();
        let len = match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(AppError::Io(e)),
        };
        if len == 0 {
            return Err(AppError::EmptyOrMissingFile {
                path: self.path.clone(),
                output_tail: output_tail.to_string(),
            });
        }
        self.len = len;
        Ok(())
    }

    /// Moves the file to `dest` and disarms cleanup of the main output
    pub fn persist(mut self, dest: &Path) -> AppResult<PathBuf> {
        if fs::rename(&self.path, dest).is_err() {
            // Cross-device moves need a copy
            fs::copy(&self.path, dest)?;
        }
        self.keep = true;
        self.remove_sidecars();
        Ok(dest.to_path_buf())
    }

    fn remove_sidecars(&self) {
        let prefix = format!("{}.", self.stem);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.filter_map(Result::ok) {
            let is_ours = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix));
            if is_ours {
                if let Err(e) = fs::remove_file(entry.path()) {
                    if e.kind() != io::ErrorKind::NotFound {
                        log::warn!("Failed to remove temp file {}: {}", entry.path().display(), e);
                    }
                }
            }
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temp file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove temp file {}: {}", self.path.display(), e),
        }
        self.remove_sidecars();
    }
}
