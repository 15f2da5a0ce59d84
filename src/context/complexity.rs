//! Conversation complexity scoring
//!
//! The score is a proxy for "how much context is needed", not a precise
//! metric: it rises with technical density, verbosity, and participant
//! diversity in recent turns, and feeds the window builder's sizing.

use super::models::Turn;
use std::collections::HashSet;

const INITIAL_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 3.0;
const RECENT_SPAN: usize = 5;
const MIN_TURNS: usize = 3;

/// Rolling complexity score over recent turns
#[derive(Debug, Clone)]
pub struct ComplexityTracker {
    technical_terms: Vec<String>,
    score: f64,
}

impl ComplexityTracker {
    pub fn new(technical_terms: Vec<String>) -> Self {
        let technical_terms = technical_terms
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        Self {
            technical_terms,
            score: INITIAL_SCORE,
        }
    }

    /// Current score, always within [1.0, 3.0]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Recompute the score from the full turn sequence.
    ///
    /// Below three turns the score keeps its initial value; otherwise the
    /// last five turns contribute technical-term hits, mean length, and
    /// sender diversity.
    pub fn recompute(&mut self, turns: &[Turn]) {
        if turns.len() < MIN_TURNS {
            return;
        }

        let recent = &turns[turns.len().saturating_sub(RECENT_SPAN)..];

        let technical_hits = recent
            .iter()
            .filter(|t| {
                let lowered = t.content.to_lowercase();
                self.technical_terms.iter().any(|term| lowered.contains(term))
            })
            .count();

        let avg_length = recent
            .iter()
            .map(|t| t.content.chars().count())
            .sum::<usize>() as f64
            / recent.len() as f64;

        let distinct_senders = recent
            .iter()
            .map(|t| t.sender.as_str())
            .collect::<HashSet<_>>()
            .len();

        let score = INITIAL_SCORE
            + 0.2 * technical_hits as f64
            + avg_length / 500.0
            + 0.1 * distinct_senders as f64;

        self.score = score.min(MAX_SCORE);
    }

    pub fn reset(&mut self) {
        self.score = INITIAL_SCORE;
    }
}
