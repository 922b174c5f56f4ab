//! Capture session for one live occurrence of a channel.
//!
//! Owns the session filename scheme and the capture tool invocation. The
//! invocation blocks until the external tool exits, which happens when the
//! stream itself ends or is interrupted; a session is complete exactly when
//! the temp file exists afterward.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use streamvault_config::ChannelConfig;
use thiserror::Error;
use tracing::error;

/// Extension given to every finished artifact.
pub const ARTIFACT_EXT: &str = "mp4";

/// Error type for capture operations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture process could not be spawned
    #[error("Failed to run capture tool: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one capture invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The capture tool exited and left the temp file behind.
    Completed,
    /// The capture tool exited without producing the temp file.
    Failed,
}

/// Strip a stream title down to a safe character set.
///
/// Keeps alphanumerics, spaces, `-`, `_`, and `.`; everything else is dropped.
pub fn sanitize_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect()
}

/// The `<channel> - <YYYY-MM-DD>` prefix shared by every session of one day.
pub fn session_prefix(channel: &str, date: NaiveDate) -> String {
    format!("{} - {}", channel, date.format("%Y-%m-%d"))
}

/// Count directory entries whose names start with the given prefix.
///
/// A missing or unreadable directory counts as zero rather than an error;
/// the numbering scheme only needs a floor, not exactness under races.
pub fn count_files_with_prefix(dir: &Path, prefix: &str) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| name.starts_with(prefix))
                .unwrap_or(false)
        })
        .count()
}

/// Build the filename for a new session on the given date.
///
/// Shape: `<channel> - <YYYY-MM-DD>[ part <N>] - <sanitized title>.mp4`.
/// `N` is one more than the number of files already carrying today's prefix
/// in the destination library, falling back to the temp directory when the
/// library has none yet, so numbering stays unique across process restarts
/// on the same day. The first session of a day gets no part suffix.
pub fn session_filename(config: &ChannelConfig, title: &str, date: NaiveDate) -> String {
    let prefix = session_prefix(&config.channel, date);

    let mut existing = count_files_with_prefix(&config.library_dir, &prefix);
    if existing == 0 {
        existing = count_files_with_prefix(&config.recorded_dir, &prefix);
    }

    let sanitized = sanitize_title(title);
    if existing == 0 {
        format!("{} - {}.{}", prefix, sanitized, ARTIFACT_EXT)
    } else {
        format!("{} part {} - {}.{}", prefix, existing + 1, sanitized, ARTIFACT_EXT)
    }
}

/// Path of the capture tool's own log file for one channel and day.
pub fn capture_log_path(config: &ChannelConfig, date: NaiveDate) -> PathBuf {
    config
        .log_dir
        .join(format!("{}-{}.log", config.channel, date.format("%Y-%m-%d")))
}

/// Build a capture command with all required flags.
///
/// The invocation carries ad mitigation, low latency, a per-channel per-day
/// log file, the stream locator, the resolved quality label, and the temp
/// output path.
pub fn build_capture_command(
    config: &ChannelConfig,
    quality: &str,
    output_path: &Path,
    date: NaiveDate,
) -> Command {
    let mut cmd = Command::new(&config.capture_bin);

    cmd.arg("--twitch-disable-ads");
    cmd.arg("--twitch-low-latency");
    cmd.arg("--logfile").arg(capture_log_path(config, date));
    cmd.arg(config.stream_url());
    cmd.arg(quality);
    cmd.arg("-o").arg(output_path);

    cmd
}

/// Run one capture session, blocking until the stream ends.
///
/// No timeout is imposed on the capture process; a live session can
/// legitimately run for hours, so a hung tool is indistinguishable from a
/// long stream and stalls this channel until it exits.
/// Completion is judged solely by the temp file existing afterward; the
/// tool's exit status is not trusted for this, since an interrupted stream
/// still leaves a usable partial capture. On failure the tool's stderr is
/// logged. The temp file is never deleted here; disposal is the
/// post-processor's job after verification.
pub fn run_capture(
    config: &ChannelConfig,
    quality: &str,
    output_path: &Path,
    date: NaiveDate,
) -> Result<CaptureOutcome, CaptureError> {
    let output = build_capture_command(config, quality, output_path, date).output()?;

    if output_path.exists() {
        Ok(CaptureOutcome::Completed)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(
            channel = %config.channel,
            status = %output.status,
            stderr = %stderr.trim(),
            "capture produced no output file"
        );
        Ok(CaptureOutcome::Failed)
    }
}
