//! Quality negotiation for capture sessions.
//!
//! A live channel publishes a set of quality labels ("720p", "1080p60",
//! "audio_only", ...). Given the configured target, this module picks the
//! label to record: the target itself when offered, otherwise the best
//! quality that stays below it.

/// Sentinel label that lets the capture tool pick its own best-effort profile.
pub const FALLBACK_QUALITY: &str = "best";

/// A quality label with its parsed resolution tier, if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureProfile {
    /// The label as published by the channel.
    pub label: String,
    /// Leading numeric resolution tier; `None` for labels like
    /// `audio_only` or `best` that carry no resolution.
    pub tier: Option<u32>,
}

impl CaptureProfile {
    /// Parse a published label into a profile.
    pub fn parse(label: &str) -> Self {
        Self {
            label: label.to_string(),
            tier: leading_tier(label),
        }
    }
}

/// Extract the leading numeric tier from a quality label.
///
/// `"720p"` and `"720p60"` both yield 720; labels without a leading number
/// (`"audio_only"`, `"best"`, `"worst"`) yield `None`.
pub fn leading_tier(label: &str) -> Option<u32> {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Pick the quality label to record from the currently published set.
///
/// Returns the target unchanged when it is offered directly. Otherwise
/// returns the available label with the highest tier strictly below the
/// target's tier. When no label qualifies, or neither the target nor any
/// available label has a parseable tier, returns [`FALLBACK_QUALITY`].
/// Malformed labels are skipped, never an error.
pub fn resolve_quality(available: &[String], target: &str) -> String {
    if available.iter().any(|label| label == target) {
        return target.to_string();
    }

    let target_tier = match leading_tier(target) {
        Some(tier) => tier,
        None => return FALLBACK_QUALITY.to_string(),
    };

    let mut best_below: Option<CaptureProfile> = None;
    for label in available {
        let profile = CaptureProfile::parse(label);
        let tier = match profile.tier {
            Some(tier) if tier < target_tier => tier,
            _ => continue,
        };
        let improves = best_below
            .as_ref()
            .and_then(|b| b.tier)
            .map_or(true, |current| tier > current);
        if improves {
            best_below = Some(profile);
        }
    }

    match best_below {
        Some(profile) => profile.label,
        None => FALLBACK_QUALITY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_target_returned_when_offered() {
        let available = labels(&["480p", "720p", "1080p"]);
        assert_eq!(resolve_quality(&available, "720p"), "720p");
    }

    #[test]
    fn test_closest_tier_below_target() {
        let available = labels(&["360p", "480p"]);
        assert_eq!(resolve_quality(&available, "720p"), "480p");
    }

    #[test]
    fn test_all_tiers_above_target_falls_back() {
        let available = labels(&["1080p", "1440p"]);
        assert_eq!(resolve_quality(&available, "720p"), FALLBACK_QUALITY);
    }

    #[test]
    fn test_malformed_labels_skipped() {
        let available = labels(&["audio_only", "worst", "480p"]);
        assert_eq!(resolve_quality(&available, "720p"), "480p");
    }

    #[test]
    fn test_only_malformed_labels_falls_back() {
        let available = labels(&["audio_only", "worst"]);
        assert_eq!(resolve_quality(&available, "720p"), FALLBACK_QUALITY);
    }

    #[test]
    fn test_empty_available_falls_back() {
        assert_eq!(resolve_quality(&[], "720p"), FALLBACK_QUALITY);
    }

    #[test]
    fn test_unparseable_target_falls_back() {
        let available = labels(&["480p", "720p60"]);
        assert_eq!(resolve_quality(&available, "source"), FALLBACK_QUALITY);
    }

    #[test]
    fn test_framerate_suffixes_use_leading_tier() {
        // 720p60 parses as tier 720, below target 1080
        let available = labels(&["720p60", "480p"]);
        assert_eq!(resolve_quality(&available, "1080p"), "720p60");
    }

    #[test]
    fn test_leading_tier_parsing() {
        assert_eq!(leading_tier("720p"), Some(720));
        assert_eq!(leading_tier("1080p60"), Some(1080));
        assert_eq!(leading_tier("audio_only"), None);
        assert_eq!(leading_tier("best"), None);
        assert_eq!(leading_tier(""), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // A directly offered target always wins, no matter what else is published.
        #[test]
        fn prop_direct_hit_wins(
            target_tier in 144u32..4320,
            extra in prop::collection::vec("[a-z0-9_]{1,12}", 0..8),
        ) {
            let target = format!("{}p", target_tier);
            let mut available = extra;
            available.push(target.clone());

            prop_assert_eq!(resolve_quality(&available, &target), target);
        }

        // The resolved label is always either the target, an offered label,
        // or the fallback sentinel; malformed input never panics or leaks out.
        #[test]
        fn prop_result_is_offered_or_fallback(
            available in prop::collection::vec("[a-zA-Z0-9_]{0,12}", 0..10),
            target in "[a-zA-Z0-9_]{1,8}",
        ) {
            let resolved = resolve_quality(&available, &target);
            let legitimate = resolved == target
                || resolved == FALLBACK_QUALITY
                || available.contains(&resolved);
            prop_assert!(
                legitimate,
                "resolved '{}' is neither target, fallback, nor offered",
                resolved
            );
        }

        // Without a direct hit, the chosen label's tier is the maximum of all
        // offered tiers strictly below the target tier.
        #[test]
        fn prop_picks_highest_tier_below_target(
            target_tier in 200u32..4000,
            tiers in prop::collection::vec(100u32..5000, 1..10),
        ) {
            let target = format!("{}p", target_tier);
            let available: Vec<String> = tiers
                .iter()
                .filter(|&&t| t != target_tier)
                .map(|t| format!("{}p", t))
                .collect();
            prop_assume!(!available.is_empty());

            let resolved = resolve_quality(&available, &target);
            let best_below = tiers
                .iter()
                .filter(|&&t| t != target_tier && t < target_tier)
                .max();

            match best_below {
                Some(&tier) => prop_assert_eq!(resolved, format!("{}p", tier)),
                None => prop_assert_eq!(resolved, FALLBACK_QUALITY),
            }
        }
    }
}
