//! Error types for Session Lens
//!
//! The replay engine itself never fails: malformed input degrades to no-ops.
//! These errors only surface at the boundaries (parsing, configuration, encoding).

use thiserror::Error;

/// Errors that can occur while loading or encoding session data
#[derive(Debug, Error)]
pub enum LensError {
    #[error("Failed to parse event log: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
