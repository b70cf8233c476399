//! Process execution with streaming output capture and hard timeouts
//!
//! Every external program (the extractor, the script runtime probe) goes
//! through [`run_command`]. It reads stdout and stderr concurrently line by
//! line into one merged capture buffer while waiting, so a chatty process can
//! never block on a full pipe. On timeout the whole process group is killed
//! and the child is reaped before returning.

use std::collections::VecDeque;
use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::core::error::{AppError, AppResult};
use crate::core::utils::{tail_lines, truncate_for_log};

/// How long to wait for a killed child to be reaped
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest line excerpt written to the debug log
const LOG_LINE_CHARS: usize = 300;

/// Program plus ordered arguments, built once and never mutated by the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following `flag`, if present
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Output retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Keep only the most recent lines (download diagnostics)
    Tail { max_lines: usize },
    /// Keep everything up to a byte bound (metadata dumps)
    All { max_bytes: usize },
}

/// Per-line observer, called for every line of either stream
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of a finished (or killed) process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when killed by a signal or after a timeout
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Merged stdout/stderr lines in arrival order
    pub lines: Vec<String>,
    /// Output exceeded the capture bound
    pub truncated: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn tail(&self, max_lines: usize) -> String {
        tail_lines(&self.lines, max_lines)
    }
}

struct OutputBuffer {
    capture: Capture,
    lines: VecDeque<String>,
    bytes: usize,
    truncated: bool,
}

impl OutputBuffer {
    fn new(capture: Capture) -> Self {
        Self {
            capture,
            lines: VecDeque::new(),
            bytes: 0,
            truncated: false,
        }
    }

    fn push(&mut self, line: &str) {
        match self.capture {
            Capture::Tail { max_lines } => {
                self.lines.push_back(line.to_string());
                while self.lines.len() > max_lines {
                    self.lines.pop_front();
                    self.truncated = true;
                }
            }
            Capture::All { max_bytes } => {
                if self.truncated {
                    return;
                }
                if self.bytes + line.len() > max_bytes {
                    self.truncated = true;
                    return;
                }
                self.bytes += line.len();
                self.lines.push_back(line.to_string());
            }
        }
    }
}

/// Kills the child's whole process group unless disarmed.
///
/// The child is spawned as a group leader, so its pid is the group id and
/// helpers it starts (ffmpeg, the script runtime) are reachable through it.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    async fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid).await;
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        // Reached with a live pgid only when the caller's future was cancelled.
        // Drop cannot await, and a spawned task may never run if the runtime is
        // shutting down, so the kill runs inline.
        if let Some(pgid) = self.pgid.take() {
            kill_group_blocking(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_args(pgid: u32) -> [String; 3] {
    ["-KILL".to_string(), "--".to_string(), format!("-{}", pgid)]
}

#[cfg(unix)]
async fn kill_group(pgid: u32) {
    let status = tokio::process::Command::new("kill")
        .args(kill_args(pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    report_kill(pgid, status);
}

#[cfg(unix)]
fn kill_group_blocking(pgid: u32) {
    let status = std::process::Command::new("kill")
        .args(kill_args(pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    report_kill(pgid, status);
}

#[cfg(unix)]
fn report_kill(pgid: u32, status: std::io::Result<std::process::ExitStatus>) {
    match status {
        Ok(status) if !status.success() => log::debug!("kill -{} exited with {}", pgid, status),
        Ok(_) => {}
        Err(e) => log::warn!("Failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
async fn kill_group(_pgid: u32) {}

#[cfg(not(unix))]
fn kill_group_blocking(_pgid: u32) {}

async fn pump<R>(reader: Option<R>, stream: &'static str, program: &str, buffer: &Mutex<OutputBuffer>, sink: Option<&LineSink>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let decoded = String::from_utf8_lossy(&raw);
                let line = decoded.trim_end_matches(['\n', '\r']);
                log::debug!("{} {}: {}", program, stream, truncate_for_log(line, LOG_LINE_CHARS));
                if let Some(sink) = sink {
                    sink(line);
                }
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.push(line);
                }
            }
            Err(e) => {
                log::warn!("Failed to read {} of {}: {}", stream, program, e);
                break;
            }
        }
    }
}

/// Runs `command` to completion or until `timeout` expires.
///
/// A non-zero exit is reported in [`ProcessOutput`], not as an error. Only a
/// failure to start the program is an error. When the returned future is
/// dropped early the process group is killed.
pub async fn run_command(
    command: &CommandLine,
    timeout: Duration,
    capture: Capture,
    sink: Option<LineSink>,
) -> AppResult<ProcessOutput> {
    log::debug!("Running: {}", command);

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| AppError::Spawn {
        program: command.program.clone(),
        source,
    })?;
    let mut group = ProcessGroup::new(child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let buffer = Mutex::new(OutputBuffer::new(capture));

    let outcome = tokio::time::timeout(timeout, async {
        let (status, _, _) = tokio::join!(
            child.wait(),
            pump(stdout, "stdout", &command.program, &buffer, sink.as_ref()),
            pump(stderr, "stderr", &command.program, &buffer, sink.as_ref()),
        );
        status
    })
    .await;

    let (exit_status, timed_out) = match outcome {
        Ok(Ok(status)) => {
            group.disarm();
            (Some(status), false)
        }
        Ok(Err(e)) => {
            group.kill().await;
            return Err(AppError::Io(e));
        }
        Err(_) => {
            log::warn!("{} timed out after {:?}, killing process group", command.program, timeout);
            group.kill().await;
            if let Err(e) = child.start_kill() {
                log::debug!("start_kill after timeout: {}", e);
            }
            match tokio::time::timeout(REAP_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => log::debug!("{} reaped with {}", command.program, status),
                Ok(Err(e)) => log::warn!("Failed to reap {}: {}", command.program, e),
                Err(_) => log::warn!("{} was not reaped within {:?}", command.program, REAP_TIMEOUT),
            }
            (None, true)
        }
    };

    let (lines, truncated) = match buffer.into_inner() {
        Ok(buffer) => (Vec::from(buffer.lines), buffer.truncated),
        Err(poisoned) => {
            let buffer = poisoned.into_inner();
            (Vec::from(buffer.lines), buffer.truncated)
        }
    };

    let output = ProcessOutput {
        exit_code: exit_status.and_then(|s| s.code()),
        success: exit_status.is_some_and(|s| s.success()),
        lines,
        truncated,
        timed_out,
        elapsed: started.elapsed(),
    };

    log::debug!(
        "{} finished: exit={:?} timed_out={} lines={} elapsed={:?}",
        command.program,
        output.exit_code,
        output.timed_out,
        output.lines.len(),
        output.elapsed
    );

    Ok(output)
}
