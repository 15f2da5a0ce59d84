//! Remote text-generation abstraction
//!
//! The engine treats the remote model as a black-box function: prompt in,
//! text out, failure as a typed error. Consumers (summarizer, selector
//! fallback, continuation controller, interjection probe) each decide their
//! own degradation when a call fails; nothing here retries on their behalf.

pub mod client;

pub use client::{HttpGenerator, HttpGeneratorConfig};

use async_trait::async_trait;

/// Errors a generation call can surface
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Whether the failure is transient (worth noting, never worth aborting a round)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Network(_) | GenerationError::RateLimited | GenerationError::Timeout
        )
    }
}

/// Remote text-generation call
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a single user-role message, optionally under a
    /// system/persona prompt, bounded by `max_tokens` output tokens.
    async fn generate(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: usize,
    ) -> Result<String, GenerationError>;
}
