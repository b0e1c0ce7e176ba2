//! Command-line interface
//!
//! Argument parsing and subcommand handlers.

pub mod args;
pub mod commands;
