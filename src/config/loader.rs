//! Configuration loader
//!
//! Loading pipeline for a session file:
//! 1. Size check and read (UTF-8 BOM tolerated)
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing into [`SessionConfig`]
//! 4. Validation (all issues collected)
//! 5. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::schema::SessionConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("SIMONLOCK_MAX_CONFIG_SIZE", 64 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<SessionConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Session configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a configuration file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large, fails to
    /// parse, references an unset required variable, or fails validation.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Loads configuration from already-read text.
    ///
    /// `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file-system failures.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, origin)?;
        let mut warnings = env_sub.warnings;

        let config: SessionConfig = if substituted.trim().is_empty() {
            warnings.push(LoadWarning {
                message: "configuration is empty, using defaults".to_string(),
                location: Some(origin.display().to_string()),
            });
            SessionConfig::default()
        } else {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text so substituted numbers keep their YAML types.
///
/// Supports:
/// - `${VAR}` - value, or empty string with a warning if unset
/// - `${VAR:-default}` - value, or `default` if unset
/// - `${VAR:?message}` - value, or a hard error if unset
/// - `$$` - literal `$`
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    fn substitute(&mut self, raw: &str, origin: &Path) -> Result<String, ConfigError> {
        let mut out = String::with_capacity(raw.len());
        for (index, line) in raw.split_inclusive('\n').enumerate() {
            self.substitute_line(line, index + 1, origin, &mut out)?;
        }
        Ok(out)
    }

    fn substitute_line(
        &mut self,
        line: &str,
        line_no: usize,
        origin: &Path,
        out: &mut String,
    ) -> Result<(), ConfigError> {
        let mut rest = line;
        while let Some(idx) = rest.find('$') {
            out.push_str(&rest[..idx]);
            let after = &rest[idx + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                out.push('$');
                rest = tail;
                continue;
            }

            let Some(body) = after.strip_prefix('{') else {
                out.push('$');
                rest = after;
                continue;
            };

            let Some(close) = body.find('}') else {
                return Err(ConfigError::ParseError {
                    path: origin.to_path_buf(),
                    line: Some(line_no),
                    message: format!("unclosed environment variable reference: ${{{body}"),
                });
            };

            let spec = VarSpec::parse(&body[..close]);
            let location = format!("{}:{line_no}", origin.display());
            out.push_str(&self.resolve(&spec, location)?);
            rest = &body[close + 1..];
        }
        out.push_str(rest);
        Ok(())
    }

    fn resolve(&mut self, spec: &VarSpec<'_>, location: String) -> Result<String, ConfigError> {
        if let Ok(value) = std::env::var(spec.name) {
            return Ok(value);
        }
        match spec.fallback {
            Fallback::Default(value) => Ok(value.to_string()),
            Fallback::Required(_) => Err(ConfigError::EnvVarNotSet {
                var: spec.name.to_string(),
                location,
            }),
            Fallback::Empty => {
                self.warnings.push(LoadWarning {
                    message: format!(
                        "environment variable '{}' is not set, using empty string",
                        spec.name
                    ),
                    location: Some(location),
                });
                Ok(String::new())
            }
        }
    }
}

struct VarSpec<'a> {
    name: &'a str,
    fallback: Fallback<'a>,
}

enum Fallback<'a> {
    Empty,
    Default(&'a str),
    Required(&'a str),
}

impl<'a> VarSpec<'a> {
    fn parse(body: &'a str) -> Self {
        if let Some((name, default)) = body.split_once(":-") {
            return Self {
                name: name.trim(),
                fallback: Fallback::Default(default),
            };
        }
        if let Some((name, message)) = body.split_once(":?") {
            return Self {
                name: name.trim(),
                fallback: Fallback::Required(message),
            };
        }
        Self {
            name: body.trim(),
            fallback: Fallback::Empty,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Placeholder origin for configuration that did not come from a file.
#[must_use]
pub fn inline_origin() -> PathBuf {
    PathBuf::from("<inline>")
}
