//! Streamvault
//!
//! Background service that watches configured live channels, captures each
//! one while live, repairs the capture, and files the result into a
//! per-channel library.

pub mod capture;
pub mod postprocess;
pub mod probe;
pub mod quality;
pub mod startup;
pub mod supervisor;
pub mod worker;

pub use streamvault_config as config;
pub use streamvault_config::{ChannelConfig, Config};

pub use capture::{
    build_capture_command, capture_log_path, run_capture, sanitize_title, session_filename,
    CaptureError, CaptureOutcome,
};
pub use postprocess::{build_repair_command, finalize, FinalizeOutcome};
pub use probe::{build_probe_command, parse_probe_output, probe_channel, LiveProbe};
pub use quality::{leading_tier, resolve_quality, CaptureProfile, FALLBACK_QUALITY};
pub use startup::{check_capture_tool, check_repair_tool, run_startup_checks, StartupError};
pub use supervisor::{Supervisor, WorkerHandle, SUPERVISE_INTERVAL_SECS};
pub use worker::{ChannelWorker, WorkerError};
