//! Configuration module
//!
//! Loading and validation of challenge session files.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::{ChallengeConfig, SessionConfig, TriggerConfig};
pub use validation::{ValidationResult, Validator, ensure_valid};
