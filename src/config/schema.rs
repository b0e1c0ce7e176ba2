//! Configuration schema
//!
//! Typed, serde-backed representation of a challenge session file.
//! Defaults reproduce the shipped puzzle: four rounds of symbols `1..=4`,
//! a four second reveal, a 1.5 second breather between rounds and a two
//! second settle after the outcome.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::challenge::{Symbol, SymbolRange};

/// Top-level session file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Pacing and shape of the challenge itself.
    #[serde(default)]
    pub challenge: ChallengeConfig,

    /// Behavior of the enemy that starts the challenge.
    #[serde(default)]
    pub trigger: TriggerConfig,
}

/// Immutable challenge configuration.
///
/// Validated once, when a [`PatternChallenge`](crate::challenge::PatternChallenge)
/// is built; an invalid configuration never reaches a running challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChallengeConfig {
    /// Number of rounds, and therefore the length of the master pattern.
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,

    /// How long each round's pattern prefix stays on screen.
    #[serde(default = "default_display_time", with = "duration_str")]
    pub pattern_display_time: Duration,

    /// Smallest symbol that can appear in the pattern.
    #[serde(default = "default_min_symbol")]
    pub min_symbol: u8,

    /// Largest symbol that can appear in the pattern.
    #[serde(default = "default_max_symbol")]
    pub max_symbol: u8,

    /// Pause between a completed round and the next reveal.
    #[serde(default = "default_round_grace", with = "duration_str")]
    pub round_grace: Duration,

    /// Pause between the outcome banner and its side effects.
    #[serde(default = "default_settle_delay", with = "duration_str")]
    pub settle_delay: Duration,

    /// Fixed RNG seed for reproducible patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ChallengeConfig {
    /// Returns the inclusive symbol range.
    ///
    /// The range is only guaranteed to be well-formed after validation.
    #[must_use]
    pub const fn symbol_range(&self) -> SymbolRange {
        SymbolRange::new_unchecked(Symbol(self.min_symbol), Symbol(self.max_symbol))
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            total_rounds: default_total_rounds(),
            pattern_display_time: default_display_time(),
            min_symbol: default_min_symbol(),
            max_symbol: default_max_symbol(),
            round_grace: default_round_grace(),
            settle_delay: default_settle_delay(),
            seed: None,
        }
    }
}

/// Configuration of the challenge-starting enemy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Whether the enemy may start the challenge again after its first hit.
    #[serde(default)]
    pub allow_repeat: bool,
}

const fn default_total_rounds() -> u32 {
    4
}

const fn default_display_time() -> Duration {
    Duration::from_secs(4)
}

const fn default_min_symbol() -> u8 {
    1
}

const fn default_max_symbol() -> u8 {
    4
}

const fn default_round_grace() -> Duration {
    Duration::from_millis(1500)
}

const fn default_settle_delay() -> Duration {
    Duration::from_secs(2)
}

/// Human-readable durations (`"4s"`, `"1500ms"`, `"1m 30s"`).
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a duration as a `humantime` string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    /// Deserializes a duration from a `humantime` string.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error for malformed durations.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(|e| {
            serde::de::Error::custom(format!(
                "invalid duration '{raw}': {e} (expected e.g. 4s, 1500ms)"
            ))
        })
    }
}
