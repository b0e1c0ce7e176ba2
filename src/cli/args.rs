//! CLI argument definitions
//!
//! All Clap derive structs for `simonlock` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Pattern-memory challenge that guards a shield barrier.
#[derive(Parser, Debug)]
#[command(name = "simonlock", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "SIMONLOCK_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "SIMONLOCK_LOG_FORMAT"
    )]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host a challenge session in this terminal.
    Play(PlayArgs),

    /// Validate challenge configuration files.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Play / Validate
// ============================================================================

/// Arguments for `play`.
///
/// Flags override the configuration file.
#[derive(Args, Debug, Default)]
pub struct PlayArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "SIMONLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of rounds.
    #[arg(short, long, env = "SIMONLOCK_ROUNDS")]
    pub rounds: Option<u32>,

    /// How long each pattern stays on screen (e.g. `4s`, `750ms`).
    #[arg(long, env = "SIMONLOCK_DISPLAY_TIME", value_parser = humantime::parse_duration)]
    pub display_time: Option<Duration>,

    /// Smallest symbol.
    #[arg(long, env = "SIMONLOCK_MIN_SYMBOL")]
    pub min_symbol: Option<u8>,

    /// Largest symbol.
    #[arg(long, env = "SIMONLOCK_MAX_SYMBOL")]
    pub max_symbol: Option<u8>,

    /// Seed for reproducible patterns.
    #[arg(long, env = "SIMONLOCK_SEED")]
    pub seed: Option<u64>,

    /// Let the trigger enemy start the challenge more than once.
    #[arg(long)]
    pub allow_repeat: bool,

    /// Exit once the first run has finished.
    #[arg(long)]
    pub once: bool,

    /// Write the JSONL event stream to this file.
    #[arg(long, env = "SIMONLOCK_EVENTS")]
    pub events: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "SIMONLOCK_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_defaults() {
        let cli = Cli::try_parse_from(["simonlock", "play"]).unwrap();
        let Commands::Play(args) = cli.command else {
            panic!("Expected PlayArgs");
        };
        assert!(args.config.is_none());
        assert!(!args.once);
        assert!(!args.allow_repeat);
    }

    #[test]
    fn test_play_parses_durations() {
        let cli = Cli::try_parse_from([
            "simonlock",
            "play",
            "--display-time",
            "750ms",
            "--rounds",
            "6",
        ])
        .unwrap();
        let Commands::Play(args) = cli.command else {
            panic!("Expected PlayArgs");
        };
        assert_eq!(args.display_time, Some(Duration::from_millis(750)));
        assert_eq!(args.rounds, Some(6));
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let cli = Cli::try_parse_from(["simonlock", "play", "--display-time", "soon"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_validate_requires_files() {
        let cli = Cli::try_parse_from(["simonlock", "validate"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["simonlock", "validate", "a.yaml", "-vv", "--color", "never"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn test_help_output() {
        let result = Cli::try_parse_from(["simonlock", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let result = Cli::try_parse_from(["simonlock", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
