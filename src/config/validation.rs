//! Configuration validation
//!
//! Semantic checks on a deserialized [`SessionConfig`]. Validation collects
//! ALL issues (doesn't stop at the first) to give complete feedback.

use std::time::Duration;

use crate::config::schema::{ChallengeConfig, SessionConfig};
use crate::error::{ConfigError, Severity, ValidationIssue};

/// Reveal times above this are legal but almost certainly a typo.
const LONG_DISPLAY_TIME: Duration = Duration::from_secs(60);

/// Round counts above this make the final prefix impractical to memorize.
const LONG_PATTERN: u32 = 32;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a whole session file.
    pub fn validate(&mut self, config: &SessionConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.check_challenge(&config.challenge, "challenge");

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    /// Validates a standalone challenge configuration.
    pub fn validate_challenge(&mut self, config: &ChallengeConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.check_challenge(config, "challenge");

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn check_challenge(&mut self, config: &ChallengeConfig, path: &str) {
        if config.total_rounds < 1 {
            self.error(
                format!("{path}.total_rounds"),
                format!("must be at least 1, got {}", config.total_rounds),
            );
        } else if config.total_rounds > LONG_PATTERN {
            self.warning(
                format!("{path}.total_rounds"),
                format!(
                    "{} rounds is longer than most players can memorize",
                    config.total_rounds
                ),
            );
        }

        if config.min_symbol > config.max_symbol {
            self.error(
                format!("{path}.max_symbol"),
                format!(
                    "must not be below min_symbol ({} < {})",
                    config.max_symbol, config.min_symbol
                ),
            );
        } else if config.min_symbol == config.max_symbol {
            self.warning(
                format!("{path}.max_symbol"),
                "single-symbol range makes every pattern identical".to_string(),
            );
        }

        if config.max_symbol > 9 {
            self.warning(
                format!("{path}.max_symbol"),
                format!(
                    "symbol {} has no single-key binding on the console",
                    config.max_symbol
                ),
            );
        }

        if config.pattern_display_time.is_zero() {
            self.error(
                format!("{path}.pattern_display_time"),
                "must be greater than zero".to_string(),
            );
        } else if config.pattern_display_time > LONG_DISPLAY_TIME {
            self.warning(
                format!("{path}.pattern_display_time"),
                format!(
                    "{} is unusually long",
                    humantime::format_duration(config.pattern_display_time)
                ),
            );
        }
    }

    fn error(&mut self, path: String, message: String) {
        self.errors.push(ValidationIssue {
            path,
            message,
            severity: Severity::Error,
        });
    }

    fn warning(&mut self, path: String, message: String) {
        self.warnings.push(ValidationIssue {
            path,
            message,
            severity: Severity::Warning,
        });
    }
}

/// Validates a challenge configuration, failing on the first batch of errors.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] carrying every error found.
pub fn ensure_valid(config: &ChallengeConfig) -> Result<(), ConfigError> {
    let result = Validator::new().validate_challenge(config);
    if result.has_errors() {
        return Err(ConfigError::ValidationError {
            path: "<inline>".to_string(),
            errors: result.errors,
        });
    }
    Ok(())
}
