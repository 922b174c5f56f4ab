//! Supervisor for the per-channel worker tasks.
//!
//! Owns one worker per configured channel and keeps it alive forever: on a
//! fixed cadence every handle is checked for liveness, and a finished task
//! (normally only possible through a panic outside the iteration guard) is
//! replaced by a fresh worker on the same channel configuration.

use crate::worker::ChannelWorker;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use streamvault_config::ChannelConfig;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Seconds between worker liveness checks.
pub const SUPERVISE_INTERVAL_SECS: u64 = 30;

/// A channel's configuration paired with its running worker task.
///
/// Replaced wholesale, never mutated, when the task is found finished.
pub struct WorkerHandle {
    config: Arc<ChannelConfig>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    fn spawn(config: Arc<ChannelConfig>) -> Self {
        let handle = tokio::spawn(ChannelWorker::new(config.clone()).run());
        Self { config, handle }
    }

    /// Whether the worker task is still running.
    pub fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Keeps exactly one live worker per configured channel.
pub struct Supervisor {
    workers: HashMap<String, WorkerHandle>,
}

impl Supervisor {
    /// Start one worker per channel configuration.
    pub fn spawn(configs: Vec<ChannelConfig>) -> Self {
        let mut workers = HashMap::new();
        for config in configs {
            let config = Arc::new(config);
            info!(channel = %config.channel, "starting worker");
            workers.insert(config.channel.clone(), WorkerHandle::spawn(config));
        }
        Self { workers }
    }

    /// Number of supervised channels.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether a given channel's worker task is currently running.
    pub fn is_worker_alive(&self, channel: &str) -> bool {
        self.workers.get(channel).map_or(false, WorkerHandle::is_alive)
    }

    /// One liveness pass: replace every finished worker with a fresh one
    /// reusing the same channel configuration. Returns how many were
    /// restarted.
    pub fn respawn_dead(&mut self) -> usize {
        let mut restarted = 0;
        for (channel, worker) in self.workers.iter_mut() {
            if worker.is_alive() {
                continue;
            }
            warn!(channel = %channel, "worker died, restarting");
            *worker = WorkerHandle::spawn(worker.config.clone());
            restarted += 1;
        }
        restarted
    }

    /// Supervise forever at the fixed cadence.
    pub async fn run(mut self) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(SUPERVISE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            self.respawn_dead();
        }
    }
}
