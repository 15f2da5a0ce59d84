//! Context window assembly under a token budget

use super::conversation::ConversationLog;
use super::token_estimator::TokenEstimator;
use std::sync::Arc;
use tracing::debug;

const SYNOPSES_INCLUDED: usize = 3;
const INCOMPLETE_MARKER: &str = " [INCOMPLETE]";

/// Assembled context ready to splice into a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Newline-joined context lines, oldest first
    pub text: String,
    /// Tokens actually included, never above the configured cap
    pub tokens: usize,
}

impl ContextWindow {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Builds a bounded, ordered slice of the conversation for one model call.
///
/// Window size scales with the complexity score between `base_window` and
/// `window_cap` turns. A sender can be excluded so a persona does not see
/// its own unanswered question as fresh input. When the conversation has
/// outgrown the window and synopses exist, the most recent synopses lead
/// the window and are charged against the budget first.
pub struct ContextWindowBuilder {
    estimator: Arc<dyn TokenEstimator>,
    base_window: usize,
    window_cap: usize,
    max_context_tokens: usize,
}

impl ContextWindowBuilder {
    pub fn new(
        estimator: Arc<dyn TokenEstimator>,
        base_window: usize,
        window_cap: usize,
        max_context_tokens: usize,
    ) -> Self {
        Self {
            estimator,
            base_window,
            window_cap,
            max_context_tokens,
        }
    }

    /// Window size for the given complexity score
    pub fn window_size(&self, complexity: f64) -> usize {
        let scaled = (self.base_window as f64 * complexity) as usize;
        scaled.min(self.window_cap)
    }

    /// Assemble the context window. An empty log yields an empty window.
    pub fn build(&self, log: &ConversationLog, exclude_sender: Option<&str>) -> ContextWindow {
        let window_size = self.window_size(log.complexity());

        let turns = log.turns();
        let start = turns.len().saturating_sub(window_size);
        let recent = &turns[start..];

        let mut parts: Vec<String> = Vec::with_capacity(recent.len() + 1);
        let mut tokens = 0usize;

        // Synopses lead only once the conversation has outgrown the window
        // (strictly more turns than the window holds).
        if log.synopsis_count() > 0 && turns.len() > window_size {
            let summary_text = format!(
                "Previous context summary: {}",
                log.recent_synopses(SYNOPSES_INCLUDED).join(" ")
            );
            let summary_tokens = self.estimator.estimate(&summary_text);
            if summary_tokens <= self.max_context_tokens {
                parts.push(summary_text);
                tokens += summary_tokens;
            }
        }

        for turn in recent {
            if exclude_sender.is_some_and(|sender| turn.sender == sender) {
                continue;
            }

            let mut line = format!("{}: {}", turn.sender, turn.content);
            if !turn.is_complete {
                line.push_str(INCOMPLETE_MARKER);
            }

            let line_tokens = self.estimator.estimate(&line);
            if tokens + line_tokens > self.max_context_tokens {
                break;
            }

            parts.push(line);
            tokens += line_tokens;
        }

        debug!(
            window_size,
            included = parts.len(),
            tokens,
            excluded = exclude_sender.unwrap_or(""),
            "Context window built"
        );

        ContextWindow {
            text: parts.join("\n"),
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::models::Turn;
    use crate::context::token_estimator::CharBasedEstimator;

    fn builder(max_tokens: usize) -> ContextWindowBuilder {
        ContextWindowBuilder::new(Arc::new(CharBasedEstimator::new()), 5, 15, max_tokens)
    }

    fn log_with_turns(count: usize) -> ConversationLog {
        // Single sender and short lines keep complexity near its floor so
        // the window stays at the base size.
        let mut log = ConversationLog::new(vec!["architecture".to_string()]);
        for i in 0..count {
            log.append(Turn::new("User", format!("m{}", i), 1));
        }
        log
    }

    #[test]
    fn test_empty_log_yields_empty_window() {
        let log = ConversationLog::new(vec![]);
        let window = builder(4000).build(&log, None);
        assert!(window.is_empty());
        assert_eq!(window.tokens, 0);
    }

    #[test]
    fn test_window_size_scaling() {
        let b = builder(4000);
        assert_eq!(b.window_size(1.0), 5);
        assert_eq!(b.window_size(1.5), 7);
        assert_eq!(b.window_size(3.0), 15);
        assert_eq!(b.window_size(10.0), 15);
    }

    #[test]
    fn test_base_window_of_recent_turns_in_order() {
        let log = log_with_turns(20);
        assert!(log.complexity() < 1.2, "short same-sender turns stay simple");

        let window = builder(4000).build(&log, None);
        let lines: Vec<&str> = window.text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "User: m15");
        assert_eq!(lines[4], "User: m19");
    }

    #[test]
    fn test_exclude_sender_drops_all_their_turns() {
        let mut log = ConversationLog::new(vec![]);
        for i in 0..6 {
            let sender = if i % 2 == 0 { "User" } else { "Rick" };
            log.append(Turn::new(sender, format!("line {}", i), 2));
        }

        let window = builder(4000).build(&log, Some("Rick"));
        assert!(!window.text.contains("Rick:"));
        assert!(window.text.contains("User:"));
    }

    #[test]
    fn test_budget_cutoff_keeps_what_fit() {
        let mut log = ConversationLog::new(vec![]);
        for i in 0..5 {
            log.append(Turn::new("User", format!("{} {}", i, "x".repeat(60)), 15));
        }

        // Each formatted line is ~16-17 tokens; a 40-token cap fits two.
        let window = builder(40).build(&log, None);
        assert!(window.tokens <= 40);
        assert!(window.text.lines().count() < 5);
        assert!(window.text.lines().count() >= 1);
    }

    #[test]
    fn test_tokens_never_exceed_cap() {
        let mut log = ConversationLog::new(vec![]);
        for i in 0..30 {
            log.append(Turn::new("User", format!("message {} {}", i, "y".repeat(200)), 50));
        }
        for cap in [10, 100, 1000, 4000] {
            let window = builder(cap).build(&log, None);
            assert!(window.tokens <= cap, "cap {} violated: {}", cap, window.tokens);
        }
    }

    #[test]
    fn test_incomplete_marker_rendered() {
        let mut log = ConversationLog::new(vec![]);
        log.append(Turn::new("Rick", "trailing off", 3).with_completeness(false));

        let window = builder(4000).build(&log, None);
        assert_eq!(window.text, "Rick: trailing off [INCOMPLETE]");
    }

    #[test]
    fn test_synopses_lead_when_log_outgrows_window() {
        let mut log = log_with_turns(20);
        log.add_synopsis("h1".to_string(), "Earlier they argued about caching.".to_string());

        let window = builder(4000).build(&log, None);
        let first = window.text.lines().next().unwrap();
        assert!(first.starts_with("Previous context summary: "));
        assert!(first.contains("caching"));
    }

    #[test]
    fn test_no_synopses_at_exactly_window_size() {
        let mut log = log_with_turns(5);
        log.add_synopsis("h1".to_string(), "should not appear".to_string());

        let window = builder(4000).build(&log, None);
        assert!(!window.text.contains("Previous context summary"));
    }

    #[test]
    fn test_only_three_most_recent_synopses() {
        let mut log = log_with_turns(20);
        for i in 0..5 {
            log.add_synopsis(format!("h{}", i), format!("synopsis-{}", i));
        }

        let window = builder(4000).build(&log, None);
        let first = window.text.lines().next().unwrap();
        assert!(!first.contains("synopsis-0"));
        assert!(!first.contains("synopsis-1"));
        assert!(first.contains("synopsis-2"));
        assert!(first.contains("synopsis-4"));
    }
}
