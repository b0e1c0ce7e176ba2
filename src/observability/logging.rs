//! Log setup for the `simonlock` binary.
//!
//! The terminal session owns stdout, so every log line goes to stderr.
//! Verbosity raises only this crate's level; dependencies stay at `warn`
//! until `-vvv`. `SIMONLOCK_LOG_LEVEL` replaces the computed filter.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "SIMONLOCK_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Plain text, colored when stderr is a terminal.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Filter directive for a `-v` count.
///
/// `0` is quiet apart from warnings, `1` adds run lifecycle (`info`), `2`
/// adds per-round and per-symbol detail (`debug`), and `3+` also lets
/// dependency crates through at `trace`.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,simonlock=info",
        2 => "warn,simonlock=debug",
        _ => "trace",
    }
}

/// Builds the filter, preferring a non-empty `override_directive`.
///
/// An override that does not parse falls back to the verbosity directive.
fn build_filter(verbosity: u8, override_directive: Option<&str>) -> EnvFilter {
    override_directive
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity_to_directive(verbosity)))
}

const fn use_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let override_directive = std::env::var(LOG_LEVEL_ENV).ok();
    let filter = build_filter(verbosity, override_directive.as_deref());
    // Module paths only help once per-round detail is on.
    let show_target = verbosity >= 2;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(show_target)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder
            .with_ansi(use_ansi(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            ))
            .try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
}
