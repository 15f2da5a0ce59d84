//! Data models for conversation turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One atomic contribution to the conversation, immutable once created.
///
/// Turns live in an ordered, append-only sequence; the id is a short hash
/// used only for external referencing (e.g. marking what a continuation
/// turn follows), never as a primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub content: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    /// Estimated token count at creation time
    pub tokens: usize,
    /// Importance weight; defaults to the complexity score at creation time
    pub importance: f64,
    pub is_complete: bool,
    /// Id of the turn this one continues, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_of: Option<String>,
}

impl Turn {
    /// Create a complete turn with importance 1.0
    pub fn new(sender: impl Into<String>, content: impl Into<String>, tokens: usize) -> Self {
        Self {
            content: content.into(),
            sender: sender.into(),
            timestamp: Utc::now(),
            tokens,
            importance: 1.0,
            is_complete: true,
            continuation_of: None,
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_completeness(mut self, is_complete: bool) -> Self {
        self.is_complete = is_complete;
        self
    }

    pub fn continues(mut self, turn_id: impl Into<String>) -> Self {
        self.continuation_of = Some(turn_id.into());
        self
    }

    /// Short identity hash over sender, timestamp, and a content prefix
    pub fn id(&self) -> String {
        use sha2::{Digest, Sha256};

        let prefix: String = self.content.chars().take(50).collect();
        let mut hasher = Sha256::new();
        hasher.update(self.sender.as_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(prefix.as_bytes());

        hex::encode(hasher.finalize())[..8].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_defaults() {
        let turn = Turn::new("User", "hello there", 2);
        assert_eq!(turn.sender, "User");
        assert!(turn.is_complete);
        assert_eq!(turn.importance, 1.0);
        assert!(turn.continuation_of.is_none());
    }

    #[test]
    fn test_turn_id_is_short_hex() {
        let turn = Turn::new("Rick", "some reply", 2);
        let id = turn.id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_turn_id_is_stable() {
        let turn = Turn::new("Rick", "some reply", 2);
        assert_eq!(turn.id(), turn.id());
    }

    #[test]
    fn test_turn_ids_differ_by_sender() {
        let a = Turn::new("Rick", "same words", 2);
        let mut b = a.clone();
        b.sender = "Judy".to_string();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_continuation_back_reference() {
        let first = Turn::new("Elliot", "part one", 2).with_completeness(false);
        let second = Turn::new("Elliot", "part two", 2).continues(first.id());
        assert_eq!(second.continuation_of.as_deref(), Some(first.id().as_str()));
    }
}
