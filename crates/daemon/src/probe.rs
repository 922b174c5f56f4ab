//! Liveness probe for monitored channels.
//!
//! A probe invokes the capture tool with its structured-output flag and
//! classifies the result without ever raising for a down or misbehaving
//! external tool: any spawn failure, non-zero exit, empty output, or
//! unparseable output is an `Error` outcome for the caller to log and retry
//! on the next poll.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Command;
use streamvault_config::ChannelConfig;

/// Result of one liveness check. Constructed fresh each poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveProbe {
    /// Channel exists but publishes no capture profiles.
    Offline,
    /// Channel is live with at least one capture profile.
    Online {
        /// Stream title from the channel metadata, when published.
        title: Option<String>,
        /// Quality labels currently offered.
        qualities: Vec<String>,
    },
    /// The probe itself failed; carries a diagnostic for logging.
    Error(String),
}

/// Structured output of the lookup command. The stream map is consulted
/// only for its key set.
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    metadata: Option<ProbeMetadata>,
    #[serde(default)]
    streams: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProbeMetadata {
    #[serde(default)]
    title: Option<String>,
}

/// Build the lookup command for one channel.
pub fn build_probe_command(config: &ChannelConfig) -> Command {
    let mut cmd = Command::new(&config.capture_bin);
    cmd.arg("--json");
    cmd.arg(config.stream_url());
    cmd
}

/// Classify the lookup command's stdout.
///
/// This is a pure function over the captured output so it can be tested
/// without the external tool. Online requires a non-empty set of published
/// capture profiles; a well-formed payload without any is Offline.
pub fn parse_probe_output(stdout: &str) -> LiveProbe {
    if stdout.trim().is_empty() {
        return LiveProbe::Error("probe produced no output".to_string());
    }

    let parsed: ProbeOutput = match serde_json::from_str(stdout) {
        Ok(parsed) => parsed,
        Err(e) => return LiveProbe::Error(format!("unparseable probe output: {}", e)),
    };

    if parsed.streams.is_empty() {
        return LiveProbe::Offline;
    }

    LiveProbe::Online {
        title: parsed.metadata.and_then(|m| m.title),
        qualities: parsed.streams.into_keys().collect(),
    }
}

/// Probe one channel by invoking the external lookup command.
///
/// Blocks until the command exits; no timeout is imposed, so a hung tool
/// stalls the caller. Never panics and never returns a raised error; every
/// failure mode is folded into [`LiveProbe::Error`].
pub fn probe_channel(config: &ChannelConfig) -> LiveProbe {
    let output = match build_probe_command(config).output() {
        Ok(output) => output,
        Err(e) => {
            return LiveProbe::Error(format!(
                "failed to run {}: {}",
                config.capture_bin.display(),
                e
            ))
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return LiveProbe::Error(format!(
            "probe exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::ffi::OsStr;
    use streamvault_config::Config;

    fn test_channel(name: &str) -> ChannelConfig {
        Config::default().channel_config(name)
    }

    #[test]
    fn test_probe_command_shape() {
        let config = test_channel("alpha");
        let cmd = build_probe_command(&config);

        assert_eq!(cmd.get_program(), OsStr::new("streamlink"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
        assert_eq!(args, vec!["--json", "twitch.tv/alpha"]);
    }

    #[test]
    fn test_parse_online_with_title_and_streams() {
        let stdout = r#"{
            "metadata": { "title": "Speedrun Sunday" },
            "streams": {
                "480p": {"url": "https://example/480"},
                "720p": {"url": "https://example/720"},
                "audio_only": {"url": "https://example/audio"}
            }
        }"#;

        match parse_probe_output(stdout) {
            LiveProbe::Online { title, qualities } => {
                assert_eq!(title.as_deref(), Some("Speedrun Sunday"));
                assert_eq!(qualities, vec!["480p", "720p", "audio_only"]);
            }
            other => panic!("expected Online, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_online_without_title() {
        let stdout = r#"{"streams": {"best": {}}}"#;

        match parse_probe_output(stdout) {
            LiveProbe::Online { title, qualities } => {
                assert_eq!(title, None);
                assert_eq!(qualities, vec!["best"]);
            }
            other => panic!("expected Online, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_streams_is_offline() {
        let stdout = r#"{"metadata": {"title": "gone"}, "streams": {}}"#;
        assert_eq!(parse_probe_output(stdout), LiveProbe::Offline);
    }

    #[test]
    fn test_parse_error_payload_is_offline() {
        // The lookup tool reports a not-live channel as an error object with
        // no stream map; without published profiles that is Offline.
        let stdout = r#"{"error": "No playable streams found on this URL"}"#;
        assert_eq!(parse_probe_output(stdout), LiveProbe::Offline);
    }

    #[test]
    fn test_parse_empty_output_is_error() {
        assert!(matches!(parse_probe_output(""), LiveProbe::Error(_)));
        assert!(matches!(parse_probe_output("  \n"), LiveProbe::Error(_)));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(matches!(
            parse_probe_output("not json at all"),
            LiveProbe::Error(_)
        ));
        assert!(matches!(
            parse_probe_output(r#"["wrong", "shape"]"#),
            LiveProbe::Error(_)
        ));
    }

    #[test]
    fn test_probe_unavailable_tool_is_error() {
        let mut config = test_channel("alpha");
        config.capture_bin = "/nonexistent/streamvault-test-binary".into();
        assert!(matches!(probe_channel(&config), LiveProbe::Error(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // Arbitrary bytes never panic the parser and never classify as Online
        // unless they happen to be a JSON object with a populated stream map.
        #[test]
        fn prop_parser_never_panics(stdout in ".{0,200}") {
            let _ = parse_probe_output(&stdout);
        }

        // Online carries exactly the published key set.
        #[test]
        fn prop_online_keys_round_trip(
            keys in prop::collection::btree_set("[a-z0-9_]{1,10}", 1..8),
            title in prop::option::of("[a-zA-Z0-9 ]{1,30}"),
        ) {
            let streams: Vec<String> = keys
                .iter()
                .map(|k| format!("\"{}\": {{}}", k))
                .collect();
            let metadata = match &title {
                Some(t) => format!("\"metadata\": {{\"title\": \"{}\"}},", t),
                None => String::new(),
            };
            let stdout = format!("{{{} \"streams\": {{{}}}}}", metadata, streams.join(", "));

            match parse_probe_output(&stdout) {
                LiveProbe::Online { title: parsed_title, qualities } => {
                    let expected: Vec<String> = keys.iter().cloned().collect();
                    prop_assert_eq!(qualities, expected);
                    prop_assert_eq!(parsed_title, title);
                }
                other => prop_assert!(false, "expected Online, got {:?}", other),
            }
        }
    }
}
