//! Common test utilities
//!
//! Integration tests run the real process runner against small shell scripts
//! that imitate the extractor, so no network or yt-dlp install is needed.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use vidfetch::core::AppConfig;

/// Shell prelude: records argv, exposes `$out` (value after `-o`) and `$url` (last arg)
const PRELUDE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$VIDFETCH_TEST_DIR/args.log"
out=""
prev=""
url=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
  url="$a"
done
"#;

/// A fake extractor installed in its own temp directory
pub struct FakeExtractor {
    pub dir: TempDir,
    pub script: PathBuf,
    pub work_dir: PathBuf,
}

impl FakeExtractor {
    /// Writes an executable script whose body runs after the prelude
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-yt-dlp");
        let work_dir = dir.path().join("work");
        fs::create_dir_all(&work_dir).unwrap();

        let prelude = PRELUDE.replace("$VIDFETCH_TEST_DIR", &dir.path().display().to_string());
        fs::write(&script, format!("{}{}\n", prelude, body)).unwrap();
        make_executable(&script);

        Self { dir, script, work_dir }
    }

    /// Prints `json` as the metadata dump
    pub fn metadata(json: &str) -> Self {
        Self::new(&format!("cat <<'EOF'\n{}\nEOF", json))
    }

    /// Writes `content` to the `-o` path and prints progress lines
    pub fn writing(content: &str) -> Self {
        Self::new(&format!(
            "echo '[download] Destination: '\"$out\"\necho '[download]  50.0% of 10.00KiB at 1.00KiB/s ETA 00:05'\nprintf '%s' '{}' > \"$out\"\necho '[download] 100% of 10.00KiB'",
            content
        ))
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            extractor_path: self.script.display().to_string(),
            temp_dir: Some(self.work_dir.clone()),
            ..AppConfig::default()
        }
    }

    pub fn shared_config(&self) -> Arc<AppConfig> {
        Arc::new(self.config())
    }

    /// Arguments of the last invocation, one per line
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("args.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Files currently left in the temp output directory
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        list_files(&self.work_dir)
    }
}

pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// The metadata dump used across tests
pub const SAMPLE_METADATA: &str = r#"{"title":"T","duration":10,"thumbnail":"x","formats":[{"format_id":"137","ext":"mp4","resolution":"1080p","vcodec":"avc1","filesize":123},{"format_id":"140","ext":"m4a","resolution":null,"vcodec":"none","abr":128}]}"#;
