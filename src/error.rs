//! Crate-level error types
//!
//! Transient remote failures never surface here: the summarizer, selector
//! fallback, continuation controller, and interjection probe each contain
//! them at the call site and degrade to a smaller but valid result.

use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(e: config::ConfigError) -> Self {
        EngineError::Configuration(e.to_string())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
