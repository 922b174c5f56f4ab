//! Per-channel worker: the monitor/capture/finalize loop.
//!
//! One worker owns one channel for the life of the process. Each iteration
//! probes the channel, records it when live, finalizes the capture, and
//! sleeps for the configured refresh interval. Failures are contained at
//! the iteration boundary; a failed session never terminates the worker,
//! and the worker never touches another channel's files.

use crate::capture::{run_capture, session_filename, CaptureError, CaptureOutcome};
use crate::postprocess::{finalize, FinalizeOutcome};
use crate::probe::{probe_channel, LiveProbe};
use crate::quality::resolve_quality;
use chrono::Local;
use std::fs;
use std::sync::Arc;
use streamvault_config::ChannelConfig;
use thiserror::Error;
use tokio::task;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Error type for one worker iteration
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Filesystem error preparing the session
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture process could not be spawned
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A blocking stage panicked or was cancelled
    #[error("blocking stage failed: {0}")]
    Join(#[from] task::JoinError),
}

/// Long-lived monitor for a single channel.
pub struct ChannelWorker {
    config: Arc<ChannelConfig>,
}

impl ChannelWorker {
    pub fn new(config: Arc<ChannelConfig>) -> Self {
        Self { config }
    }

    /// Run the monitor loop forever.
    ///
    /// Leftover captures from a prior unclean shutdown are finalized before
    /// the first poll, so no session is permanently lost to a crash. Any
    /// error inside one iteration is logged and the loop continues; only
    /// external termination ends a worker.
    pub async fn run(self) {
        if let Err(e) = self.prepare_directories() {
            error!(channel = %self.config.channel, error = %e, "failed to create channel directories");
        }

        self.sweep_leftovers().await;

        info!(
            channel = %self.config.channel,
            refresh_secs = self.config.refresh.as_secs(),
            "monitoring channel"
        );

        let mut last_was_offline = false;
        loop {
            if let Err(e) = self.run_once(&mut last_was_offline).await {
                error!(channel = %self.config.channel, error = %e, "iteration failed");
            }
            tokio::time::sleep(self.config.refresh).await;
        }
    }

    /// One iteration: probe, and record when live.
    async fn run_once(&self, last_was_offline: &mut bool) -> Result<(), WorkerError> {
        let config = self.config.clone();
        let probe = task::spawn_blocking(move || probe_channel(&config)).await?;
        self.handle_probe(probe, last_was_offline).await
    }

    /// Dispatch one probe result.
    ///
    /// Offline is logged only on the edge into the offline state so an idle
    /// channel does not flood the log once per poll. Probe errors are logged
    /// every time; a persistent tool or environment problem is worth
    /// surfacing repeatedly.
    async fn handle_probe(
        &self,
        probe: LiveProbe,
        last_was_offline: &mut bool,
    ) -> Result<(), WorkerError> {
        match probe {
            LiveProbe::Offline => {
                if !*last_was_offline {
                    info!(channel = %self.config.channel, "channel is offline");
                }
                *last_was_offline = true;
                Ok(())
            }
            LiveProbe::Error(msg) => {
                *last_was_offline = false;
                error!(channel = %self.config.channel, "probe failed: {}", msg);
                Ok(())
            }
            LiveProbe::Online { title, qualities } => {
                *last_was_offline = false;
                self.record_session(title, qualities).await
            }
        }
    }

    /// Capture one live session and deliver it to the library.
    async fn record_session(
        &self,
        title: Option<String>,
        qualities: Vec<String>,
    ) -> Result<(), WorkerError> {
        let config = self.config.clone();

        // First session for a new channel, or a library pruned out from
        // under us: the destination must exist before part counting.
        fs::create_dir_all(&config.library_dir)?;
        fs::create_dir_all(&config.recorded_dir)?;
        fs::create_dir_all(&config.log_dir)?;

        let quality = resolve_quality(&qualities, &config.quality);
        let title = title.unwrap_or_else(|| config.channel.clone());
        let date = Local::now().date_naive();
        let filename = session_filename(&config, &title, date);
        let temp_path = config.recorded_dir.join(&filename);
        let dest_path = config.library_dir.join(&filename);

        info!(
            channel = %config.channel,
            title = %title,
            quality = %quality,
            file = %filename,
            "channel is live, recording"
        );

        let capture_config = config.clone();
        let capture_temp = temp_path.clone();
        let outcome = task::spawn_blocking(move || {
            run_capture(&capture_config, &quality, &capture_temp, date)
        })
        .await??;

        match outcome {
            CaptureOutcome::Completed => {
                info!(channel = %config.channel, "capture ended, finalizing");
                let finalize_config = config.clone();
                let finalized = task::spawn_blocking(move || {
                    finalize(&finalize_config, &temp_path, &dest_path)
                })
                .await?;
                log_finalize_outcome(&config, finalized);
            }
            CaptureOutcome::Failed => {
                warn!(channel = %config.channel, "capture delivered nothing this cycle");
            }
        }

        Ok(())
    }

    /// Finalize files left in the temp directory by a prior crashed run.
    async fn sweep_leftovers(&self) {
        let leftovers: Vec<_> = WalkDir::new(&self.config.recorded_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        if leftovers.is_empty() {
            return;
        }

        info!(
            channel = %self.config.channel,
            count = leftovers.len(),
            "finalizing captures left over from a previous run"
        );

        for temp_path in leftovers {
            let dest_path = match temp_path.file_name() {
                Some(name) => self.config.library_dir.join(name),
                None => continue,
            };

            let config = self.config.clone();
            let result = task::spawn_blocking(move || finalize(&config, &temp_path, &dest_path)).await;
            match result {
                Ok(outcome) => log_finalize_outcome(&self.config, outcome),
                Err(e) => {
                    error!(channel = %self.config.channel, error = %e, "leftover finalize stage failed")
                }
            }
        }
    }

    fn prepare_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config.recorded_dir)?;
        fs::create_dir_all(&self.config.library_dir)?;
        fs::create_dir_all(&self.config.log_dir)?;
        Ok(())
    }
}

fn log_finalize_outcome(config: &ChannelConfig, outcome: FinalizeOutcome) {
    match outcome {
        FinalizeOutcome::Repaired => {
            info!(channel = %config.channel, "session repaired and filed")
        }
        FinalizeOutcome::Moved => {
            info!(channel = %config.channel, "session filed without repair")
        }
        FinalizeOutcome::Failed => {
            error!(channel = %config.channel, "session could not be delivered, operator attention required")
        }
    }
}
