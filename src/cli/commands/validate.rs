//! Configuration validation
//!
//! Loads every file through the normal loader and reports the outcome
//! without starting a session.

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadResult};
use crate::error::{ChallengeError, ConfigError, Severity, ValidationIssue};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validate configuration files.
///
/// Every file is checked even after a failure; the first failure is
/// returned once all reports have been printed.
///
/// # Errors
///
/// Returns the first load error, or a validation error for the first
/// file with warnings when `--strict` is set.
pub fn run(args: &ValidateArgs) -> Result<(), ChallengeError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_failure: Option<ConfigError> = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let file = path.display().to_string();

        let report = match loader.load(path) {
            Ok(LoadResult { warnings, .. }) => {
                for warning in &warnings {
                    tracing::warn!(
                        location = warning.location.as_deref().unwrap_or("<unknown>"),
                        "{}",
                        warning.message
                    );
                }
                let strict_failure = args.strict && !warnings.is_empty();
                if strict_failure && first_failure.is_none() {
                    first_failure = Some(ConfigError::ValidationError {
                        path: file.clone(),
                        errors: warnings
                            .iter()
                            .map(|w| ValidationIssue {
                                path: w.location.clone().unwrap_or_default(),
                                message: w.message.clone(),
                                severity: Severity::Warning,
                            })
                            .collect(),
                    });
                }
                FileReport {
                    file,
                    valid: !strict_failure,
                    errors: Vec::new(),
                    warnings: warnings.iter().map(ToString::to_string).collect(),
                }
            }
            Err(error) => {
                let errors = match &error {
                    ConfigError::ValidationError { errors, .. } => {
                        errors.iter().map(ToString::to_string).collect()
                    }
                    other => vec![other.to_string()],
                };
                if first_failure.is_none() {
                    first_failure = Some(error);
                }
                FileReport {
                    file,
                    valid: false,
                    errors,
                    warnings: Vec::new(),
                }
            }
        };
        reports.push(report);
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                let mark = if report.valid { "ok" } else { "FAILED" };
                println!("{}: {mark}", report.file);
                for error in &report.errors {
                    println!("  error: {error}");
                }
                for warning in &report.warnings {
                    println!("  warning: {warning}");
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    first_failure.map_or(Ok(()), |error| Err(error.into()))
}
