//! Progressive condensation of older turns
//!
//! On a fixed cadence the middle-aged slice of the conversation (older than
//! the recent window, younger than already-forgotten history) is condensed
//! into a short synopsis through the remote API. Summarization is
//! best-effort: every failure is swallowed and the conversation carries on
//! with full turns only.

use super::conversation::ConversationLog;
use crate::llm::TextGenerator;
use crate::metrics::METRICS;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

const MIN_TURNS: usize = 10;
const SPAN_START_BACK: usize = 15;
const SPAN_END_BACK: usize = 5;

/// Remote-backed summarizer for conversation spans
pub struct ConversationSummarizer {
    generator: Arc<dyn TextGenerator>,
    summarize_every: usize,
    summary_max_tokens: usize,
}

impl ConversationSummarizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        summarize_every: usize,
        summary_max_tokens: usize,
    ) -> Self {
        Self {
            generator,
            summarize_every,
            summary_max_tokens,
        }
    }

    /// Whether the cadence says to attempt summarization after this append
    pub fn due(&self, log: &ConversationLog) -> bool {
        !log.is_empty() && log.len() % self.summarize_every == 0
    }

    /// Condense the middle-aged span into a synopsis, if warranted.
    ///
    /// No-op below ten turns, for an already-summarized span, and on any
    /// remote failure.
    pub async fn maybe_summarize(&self, log: &mut ConversationLog) -> Option<String> {
        if log.len() < MIN_TURNS {
            return None;
        }

        let end = log.len() - SPAN_END_BACK;
        let start = log.len().saturating_sub(SPAN_START_BACK);
        let span = &log.turns()[start..end];
        if span.is_empty() {
            return None;
        }

        let block = span
            .iter()
            .map(|t| format!("{}: {}", t.sender, t.content))
            .collect::<Vec<_>>()
            .join("\n");

        let span_hash = Self::span_hash(&block);
        if log.has_synopsis(&span_hash) {
            debug!(span_hash, "Span already summarized");
            METRICS.record_summarization("skipped");
            return None;
        }

        let prompt = format!(
            "Summarize the key points of this conversation in 2-3 sentences:\n\n{}",
            block
        );

        match self
            .generator
            .generate(None, &prompt, self.summary_max_tokens)
            .await
        {
            Ok(text) => {
                let synopsis = text.trim().to_string();
                debug!(span_hash, turns = span.len(), "Synopsis stored");
                log.add_synopsis(span_hash, synopsis.clone());
                METRICS.record_summarization("stored");
                Some(synopsis)
            }
            Err(e) => {
                warn!("Summarization failed, continuing without synopsis: {}", e);
                METRICS.record_summarization("failed");
                None
            }
        }
    }

    fn span_hash(block: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(block.as_bytes());
        hex::encode(hasher.finalize())[..8].to_string()
    }
}
