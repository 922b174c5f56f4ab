//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Poll intervals below this are clamped up when deriving per-channel settings.
pub const MIN_REFRESH_SECS: u64 = 30;

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// External tool paths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Capture tool binary (also used for liveness probes)
    #[serde(default = "default_capture_bin")]
    pub capture_bin: PathBuf,
    /// Repair/remux tool binary
    #[serde(default = "default_repair_bin")]
    pub repair_bin: PathBuf,
}

fn default_capture_bin() -> PathBuf {
    PathBuf::from("streamlink")
}

fn default_repair_bin() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            capture_bin: default_capture_bin(),
            repair_bin: default_repair_bin(),
        }
    }
}

/// Filesystem layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Working root; in-progress captures land under `<root>/recorded/<channel>`,
    /// capture tool logs under `<root>/logs`
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Destination library root; finished files land under `<library>/<channel>`
    #[serde(default = "default_library")]
    pub library: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("recorder")
}

fn default_library() -> PathBuf {
    PathBuf::from("streams")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            library: default_library(),
        }
    }
}

/// Recorder behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecorderConfig {
    /// Seconds between liveness polls (clamped to at least 30)
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Target capture quality label
    #[serde(default = "default_quality")]
    pub quality: String,
    /// Skip the repair pass and move captures into the library as-is
    #[serde(default)]
    pub disable_fixup: bool,
}

fn default_refresh_secs() -> u64 {
    MIN_REFRESH_SECS
}

fn default_quality() -> String {
    "720p".to_string()
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            quality: default_quality(),
            disable_fixup: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Channel names to monitor
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Immutable per-channel settings handed to exactly one worker.
///
/// Derived once from [`Config`] at startup and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Channel name
    pub channel: String,
    /// Capture tool binary (also used for liveness probes)
    pub capture_bin: PathBuf,
    /// Repair/remux tool binary
    pub repair_bin: PathBuf,
    /// Directory for in-progress captures for this channel
    pub recorded_dir: PathBuf,
    /// Destination library directory for this channel
    pub library_dir: PathBuf,
    /// Directory for capture tool log files
    pub log_dir: PathBuf,
    /// Interval between liveness polls
    pub refresh: Duration,
    /// Target capture quality label
    pub quality: String,
    /// Skip the repair pass and move captures into the library as-is
    pub disable_fixup: bool,
}

impl ChannelConfig {
    /// Stream locator passed to the capture and probe invocations.
    pub fn stream_url(&self) -> String {
        format!("twitch.tv/{}", self.channel)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - STREAMVAULT_CHANNELS -> channels (comma-separated)
    /// - STREAMVAULT_REFRESH_SECS -> recorder.refresh_secs
    /// - STREAMVAULT_QUALITY -> recorder.quality
    /// - STREAMVAULT_ROOT -> paths.root
    /// - STREAMVAULT_LIBRARY -> paths.library
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("STREAMVAULT_CHANNELS") {
            let channels: Vec<String> = val
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if !channels.is_empty() {
                self.channels = channels;
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_REFRESH_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.recorder.refresh_secs = secs;
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_QUALITY") {
            if !val.is_empty() {
                self.recorder.quality = val;
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_ROOT") {
            if !val.is_empty() {
                self.paths.root = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("STREAMVAULT_LIBRARY") {
            if !val.is_empty() {
                self.paths.library = PathBuf::from(val);
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Derive the immutable per-channel settings for one channel.
    ///
    /// The refresh interval is floor-clamped to [`MIN_REFRESH_SECS`].
    pub fn channel_config(&self, channel: &str) -> ChannelConfig {
        let refresh_secs = self.recorder.refresh_secs.max(MIN_REFRESH_SECS);
        ChannelConfig {
            channel: channel.to_string(),
            capture_bin: self.tools.capture_bin.clone(),
            repair_bin: self.tools.repair_bin.clone(),
            recorded_dir: self.paths.root.join("recorded").join(channel),
            library_dir: self.paths.library.join(channel),
            log_dir: self.paths.root.join("logs"),
            refresh: Duration::from_secs(refresh_secs),
            quality: self.recorder.quality.clone(),
            disable_fixup: self.recorder.disable_fixup,
        }
    }

    /// Derive settings for every configured channel.
    pub fn channel_configs(&self) -> Vec<ChannelConfig> {
        self.channels
            .iter()
            .map(|c| self.channel_config(c))
            .collect()
    }
}
