//! Startup checks for the recorder daemon.
//!
//! Preflight verification that both external tools respond to their version
//! flags before any worker starts. A recorder pointed at a missing
//! streamlink or ffmpeg would otherwise fail identically on every poll.

use std::path::Path;
use std::process::Command;
use streamvault_config::Config;
use thiserror::Error;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Capture tool not available: {0}")]
    CaptureToolUnavailable(String),

    #[error("Repair tool not available: {0}")]
    RepairToolUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check that the capture tool answers `--version`.
pub fn check_capture_tool(bin: &Path) -> Result<(), StartupError> {
    let output = Command::new(bin).arg("--version").output().map_err(|e| {
        StartupError::CaptureToolUnavailable(format!(
            "{} --version failed; is streamlink installed and in PATH? Error: {}",
            bin.display(),
            e
        ))
    })?;

    if !output.status.success() {
        return Err(StartupError::CaptureToolUnavailable(format!(
            "{} --version exited with {}",
            bin.display(),
            output.status
        )));
    }

    Ok(())
}

/// Check that the repair tool answers `-version`.
pub fn check_repair_tool(bin: &Path) -> Result<(), StartupError> {
    let output = Command::new(bin).arg("-version").output().map_err(|e| {
        StartupError::RepairToolUnavailable(format!(
            "{} -version failed; is ffmpeg installed and in PATH? Error: {}",
            bin.display(),
            e
        ))
    })?;

    if !output.status.success() {
        return Err(StartupError::RepairToolUnavailable(format!(
            "{} -version exited with {}",
            bin.display(),
            output.status
        )));
    }

    Ok(())
}

/// Run all startup checks in order: capture tool, then repair tool.
pub fn run_startup_checks(config: &Config) -> Result<(), StartupError> {
    check_capture_tool(&config.tools.capture_bin)?;
    check_repair_tool(&config.tools.repair_bin)?;
    Ok(())
}
