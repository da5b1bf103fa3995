//! Error types for Glasswatch.
//!
//! The detector core is deliberately total: analysis never returns an
//! error and never interrupts the host agent run. The fallible surface is
//! limited to configuration (custom pattern compilation) and decoding of
//! externally stored snapshots.

use thiserror::Error;

/// Primary error type for all Glasswatch operations.
#[derive(Error, Debug)]
pub enum GlasswatchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GlasswatchError>;
