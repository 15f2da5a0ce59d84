//! Append-only conversation state

use super::complexity::ComplexityTracker;
use super::models::Turn;
use indexmap::IndexMap;
use tracing::debug;

/// Ordered conversation history with synopsis storage and token accounting.
///
/// Turns are only ever appended; insertion order is chronological order.
/// The total token count stays equal to the sum of per-turn estimates, and
/// the complexity score is recomputed from scratch after every append.
#[derive(Debug)]
pub struct ConversationLog {
    turns: Vec<Turn>,
    /// Synopsis text keyed by a hash of the summarized span; insertion
    /// order doubles as recency for the most-recent-synopses rule.
    synopses: IndexMap<String, String>,
    total_tokens: usize,
    complexity: ComplexityTracker,
}

impl ConversationLog {
    pub fn new(technical_terms: Vec<String>) -> Self {
        Self {
            turns: Vec::new(),
            synopses: IndexMap::new(),
            total_tokens: 0,
            complexity: ComplexityTracker::new(technical_terms),
        }
    }

    /// Append a turn, update the token total, and recompute complexity
    pub fn append(&mut self, turn: Turn) {
        self.total_tokens += turn.tokens;
        self.turns.push(turn);
        self.complexity.recompute(&self.turns);

        debug!(
            turns = self.turns.len(),
            total_tokens = self.total_tokens,
            complexity = self.complexity.score(),
            "Turn appended"
        );
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn complexity(&self) -> f64 {
        self.complexity.score()
    }

    /// Store a synopsis under its span hash. Returns false when the span
    /// was already summarized.
    pub fn add_synopsis(&mut self, span_hash: String, synopsis: String) -> bool {
        if self.synopses.contains_key(&span_hash) {
            return false;
        }
        self.synopses.insert(span_hash, synopsis);
        true
    }

    pub fn has_synopsis(&self, span_hash: &str) -> bool {
        self.synopses.contains_key(span_hash)
    }

    pub fn synopsis_count(&self) -> usize {
        self.synopses.len()
    }

    /// The `count` most recently stored synopsis texts, oldest first
    pub fn recent_synopses(&self, count: usize) -> Vec<&str> {
        let skip = self.synopses.len().saturating_sub(count);
        self.synopses.values().skip(skip).map(|s| s.as_str()).collect()
    }

    /// Drop all turns, synopses, and counters back to the empty state
    pub fn reset(&mut self) {
        self.turns.clear();
        self.synopses.clear();
        self.total_tokens = 0;
        self.complexity.reset();
    }
}
