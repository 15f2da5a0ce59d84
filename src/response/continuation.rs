//! Continuation-on-truncation controller

use super::verifier::CompletionVerifier;
use crate::context::token_estimator::TokenEstimator;
use crate::llm::TextGenerator;
use crate::metrics::METRICS;
use crate::personas::Persona;
use std::sync::Arc;
use tracing::{debug, warn};

/// Characters of the latest fragment quoted back in a continuation prompt
const TAIL_QUOTE_CHARS: usize = 100;

/// Outcome of a completion-verified generation
#[derive(Debug, Clone)]
pub struct CompletedReply {
    /// All fragments joined in order with single spaces
    pub text: String,
    /// False only when the attempt budget ran out on a still-truncated reply
    pub is_complete: bool,
    /// Estimated tokens across all fragments
    pub tokens: usize,
}

/// Drives repeated remote calls until the verifier is satisfied.
///
/// Each incomplete fragment spawns a continuation prompt quoting its tail.
/// A hard remote failure stops the protocol immediately with whatever
/// accumulated: surfacing a degraded answer beats looping on a dead
/// endpoint, so the failure branch reports the reply as complete.
pub struct ResponseController {
    generator: Arc<dyn TextGenerator>,
    estimator: Arc<dyn TokenEstimator>,
    verifier: CompletionVerifier,
    max_response_tokens: usize,
    max_attempts: usize,
}

impl ResponseController {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        estimator: Arc<dyn TokenEstimator>,
        verifier: CompletionVerifier,
        max_response_tokens: usize,
        max_attempts: usize,
    ) -> Self {
        Self {
            generator,
            estimator,
            verifier,
            max_response_tokens,
            max_attempts,
        }
    }

    pub fn max_response_tokens(&self) -> usize {
        self.max_response_tokens
    }

    /// Generate a reply for the persona, continuing while it looks cut off
    pub async fn complete_reply(&self, persona: &Persona, prompt: &str) -> CompletedReply {
        let mut fragments: Vec<String> = Vec::new();
        let mut total_tokens = 0usize;
        let mut is_complete = false;
        let mut attempt = 0usize;
        let mut current_prompt = prompt.to_string();

        while attempt < self.max_attempts && !is_complete {
            match self
                .generator
                .generate(
                    Some(&persona.personality),
                    &current_prompt,
                    self.max_response_tokens,
                )
                .await
            {
                Ok(text) => {
                    METRICS.record_remote_call("response", true);

                    let fragment_tokens = self.estimator.estimate(&text);
                    total_tokens += fragment_tokens;
                    is_complete =
                        self.verifier
                            .is_complete(&text, fragment_tokens, self.max_response_tokens);

                    debug!(
                        persona = %persona.name,
                        attempt,
                        fragment_tokens,
                        is_complete,
                        "Fragment received"
                    );

                    let tail = tail_chars(&text, TAIL_QUOTE_CHARS);
                    fragments.push(text);

                    if !is_complete {
                        current_prompt = format!(
                            "Continue your previous response. You were saying:\n\"{}\"\n\nPlease continue from where you left off.",
                            tail
                        );
                        attempt += 1;
                        METRICS.continuation_attempts.inc();
                    }
                }
                Err(e) => {
                    METRICS.record_remote_call("response", false);
                    warn!(
                        persona = %persona.name,
                        "Generation failed, keeping what accumulated: {}", e
                    );
                    // Hard failures are not truncations; stop here rather
                    // than re-asking a dead endpoint.
                    is_complete = true;
                }
            }
        }

        if !is_complete {
            METRICS.continuations_exhausted.inc();
        }

        CompletedReply {
            text: fragments.join(" "),
            is_complete,
            tokens: total_tokens,
        }
    }
}

fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}
