//! `simonlock` - pattern-memory challenge guarding a shield barrier
//!
//! A "Simon Says" state machine: a random master pattern is revealed one
//! growing prefix per round, the player repeats each prefix, the first
//! wrong symbol fails the run and triggers a hard level reset, and the
//! last round releases the barrier.

pub mod challenge;
pub mod cli;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod observability;
pub mod world;
