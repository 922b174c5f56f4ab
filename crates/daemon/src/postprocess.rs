//! Post-processing of finished captures.
//!
//! A capture comes out of the tool with whatever decode errors the live
//! stream suffered. Finalization repairs it with an error-tolerant stream
//! copy into the destination library; when the repair tool fails or is
//! unavailable, the raw capture is moved into place instead so a transcode
//! failure never loses a session.

use std::fs;
use std::path::Path;
use std::process::Command;
use streamvault_config::ChannelConfig;
use tracing::{error, info, warn};

/// Outcome of finalizing one captured file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The repair tool wrote the destination file; the temp copy is gone.
    Repaired,
    /// The raw capture was relocated unchanged.
    Moved,
    /// Neither a repaired nor a relocated file exists. Terminal for this
    /// session; the temp file, if any survives, is left for manual recovery.
    Failed,
}

/// Build the repair command: error-tolerant decode, stream copy without
/// re-encoding, writing directly to the destination. `-n` makes the tool
/// refuse to clobber an existing destination file.
pub fn build_repair_command(config: &ChannelConfig, temp_path: &Path, dest_path: &Path) -> Command {
    let mut cmd = Command::new(&config.repair_bin);

    cmd.arg("-err_detect").arg("ignore_err");
    cmd.arg("-i").arg(temp_path);
    cmd.arg("-c").arg("copy");
    cmd.arg("-n");
    cmd.arg(dest_path);

    cmd
}

/// Move a file, falling back to copy-then-remove when rename fails
/// (destination library on a different filesystem).
fn move_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst)?;
    fs::remove_file(src)?;
    Ok(())
}

/// Deliver a captured file to its destination path.
///
/// With fix-up disabled the capture is moved as-is. Otherwise the repair
/// tool runs first; if it leaves no destination file, the raw capture is
/// moved into place as a last resort. Only when neither route produces a
/// destination file is the session a loss, and then the temp copy is left
/// in place for manual recovery.
pub fn finalize(config: &ChannelConfig, temp_path: &Path, dest_path: &Path) -> FinalizeOutcome {
    if config.disable_fixup {
        return match move_file(temp_path, dest_path) {
            Ok(()) => {
                info!(
                    channel = %config.channel,
                    dest = %dest_path.display(),
                    "moved capture into library"
                );
                FinalizeOutcome::Moved
            }
            Err(e) => {
                error!(
                    channel = %config.channel,
                    temp = %temp_path.display(),
                    error = %e,
                    "failed to move capture into library"
                );
                FinalizeOutcome::Failed
            }
        };
    }

    match build_repair_command(config, temp_path, dest_path).output() {
        Ok(output) if dest_path.exists() => {
            if !output.status.success() {
                // The destination predates this run; -n made the tool
                // refuse to overwrite it, which still commits exactly once.
                warn!(
                    channel = %config.channel,
                    dest = %dest_path.display(),
                    "repair tool refused to overwrite existing destination"
                );
            }
            if let Err(e) = fs::remove_file(temp_path) {
                warn!(
                    channel = %config.channel,
                    temp = %temp_path.display(),
                    error = %e,
                    "repaired but could not remove temp copy"
                );
            }
            info!(
                channel = %config.channel,
                dest = %dest_path.display(),
                "repaired capture into library"
            );
            FinalizeOutcome::Repaired
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                channel = %config.channel,
                status = %output.status,
                stderr = %stderr.trim(),
                "repair produced no output file"
            );
            rescue_raw_capture(config, temp_path, dest_path)
        }
        Err(e) => {
            error!(
                channel = %config.channel,
                tool = %config.repair_bin.display(),
                error = %e,
                "failed to run repair tool"
            );
            rescue_raw_capture(config, temp_path, dest_path)
        }
    }
}

/// Last resort after a failed repair: deliver the raw capture unchanged.
fn rescue_raw_capture(
    config: &ChannelConfig,
    temp_path: &Path,
    dest_path: &Path,
) -> FinalizeOutcome {
    if temp_path.exists() && !dest_path.exists() {
        match move_file(temp_path, dest_path) {
            Ok(()) => {
                warn!(
                    channel = %config.channel,
                    dest = %dest_path.display(),
                    "repair failed, moved raw capture into library"
                );
                return FinalizeOutcome::Moved;
            }
            Err(e) => {
                error!(
                    channel = %config.channel,
                    temp = %temp_path.display(),
                    error = %e,
                    "repair failed and raw capture could not be moved"
                );
            }
        }
    }

    error!(
        channel = %config.channel,
        temp = %temp_path.display(),
        dest = %dest_path.display(),
        "session lost: no repaired or relocated file exists"
    );
    FinalizeOutcome::Failed
}
