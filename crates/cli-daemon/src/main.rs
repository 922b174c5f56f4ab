//! CLI entry point for the Streamvault recorder daemon
//!
//! Parses command line arguments, loads configuration, and runs the
//! supervisor until a termination signal arrives.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use streamvault::{run_startup_checks, Supervisor};
use streamvault_config::Config;
use tracing::{error, info};

/// Streamvault - Automated recording of live channels into a media library
#[derive(Parser, Debug)]
#[command(name = "streamvault")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Comma-separated channel names, overriding the configured list
    channels: Option<String>,

    /// Skip startup checks (streamlink, ffmpeg availability). For testing only.
    #[arg(long, default_value = "false")]
    skip_checks: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config from {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(channels) = &args.channels {
        config.channels = channels
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    if config.channels.is_empty() {
        error!("No channels to monitor; set them in the config file or on the command line");
        return ExitCode::FAILURE;
    }

    if args.skip_checks {
        info!("Skipping startup checks (--skip-checks enabled)");
    } else if let Err(e) = run_startup_checks(&config) {
        error!("Startup check failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        channels = %config.channels.join(", "),
        refresh_secs = config.recorder.refresh_secs,
        "starting recorder"
    );

    let supervisor = Supervisor::spawn(config.channel_configs());

    // A termination signal exits immediately with no drain; in-flight
    // capture processes are abandoned to the OS.
    tokio::select! {
        _ = supervisor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("termination signal received, exiting");
        }
    }

    ExitCode::SUCCESS
}
