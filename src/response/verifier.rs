//! Heuristic detection of truncated replies

/// Characters a finished sentence is allowed to end on
const TERMINAL_CHARS: [char; 5] = ['.', '!', '?', '"', ')'];

/// How many trailing words are scanned for transition adverbs
const TAIL_WORDS: usize = 3;

/// Judges whether a generated reply is finished or was cut off.
///
/// This is a safety net, not a parser: flagging a finished reply as
/// incomplete costs one continuation attempt at worst, while missing a real
/// cutoff ships half an answer, so the rules lean toward flagging.
#[derive(Debug, Clone)]
pub struct CompletionVerifier {
    continuation_threshold: f64,
    transition_adverbs: Vec<String>,
}

impl CompletionVerifier {
    pub fn new(continuation_threshold: f64, transition_adverbs: Vec<String>) -> Self {
        Self {
            continuation_threshold,
            transition_adverbs,
        }
    }

    /// Whether the reply appears complete given how much of the output
    /// budget it consumed.
    pub fn is_complete(&self, response: &str, tokens_used: usize, max_tokens: usize) -> bool {
        // Near-budget replies that do not end on sentence punctuation were
        // almost certainly clipped by the token limit.
        if tokens_used as f64 > max_tokens as f64 * self.continuation_threshold {
            let trimmed = response.trim_end();
            if !trimmed.is_empty() && !trimmed.ends_with(TERMINAL_CHARS) {
                return false;
            }
        }

        // A transition adverb in the last few words reads as a mid-list or
        // mid-clause cutoff no matter how short the reply is.
        let tail_words: Vec<&str> = {
            let words: Vec<&str> = response.split_whitespace().collect();
            words[words.len().saturating_sub(TAIL_WORDS)..].to_vec()
        };
        let tail = tail_words.join(" ");
        if self.transition_adverbs.iter().any(|adverb| tail.contains(adverb)) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResponseConfig;

    fn verifier() -> CompletionVerifier {
        let cfg = ResponseConfig::default();
        CompletionVerifier::new(cfg.continuation_threshold, cfg.transition_adverbs)
    }

    #[test]
    fn test_near_budget_without_terminal_punctuation_is_incomplete() {
        let v = verifier();
        let reply = "the fix is to rotate the credentials and finally,";
        assert!(!v.is_complete(reply, 95, 100));
    }

    #[test]
    fn test_near_budget_with_terminal_punctuation_is_complete() {
        let v = verifier();
        let reply = "rotate the credentials and that's final.";
        assert!(v.is_complete(reply, 95, 100));
    }

    #[test]
    fn test_short_reply_without_punctuation_is_complete() {
        let v = verifier();
        assert!(v.is_complete("sure thing", 10, 100));
    }

    #[test]
    fn test_trailing_transition_adverb_flags_regardless_of_length() {
        let v = verifier();
        assert!(!v.is_complete("Three steps. First,", 5, 400));
        assert!(!v.is_complete("I would add more. However,", 5, 400));
    }

    #[test]
    fn test_transition_adverb_mid_reply_does_not_flag() {
        let v = verifier();
        let reply = "However, the cache is fine and the deploy can proceed.";
        assert!(v.is_complete(reply, 20, 400));
    }

    #[test]
    fn test_empty_reply_is_complete() {
        // An empty reply carries no truncation evidence; the caller decides
        // what to do with it.
        let v = verifier();
        assert!(v.is_complete("", 100, 100));
    }

    #[test]
    fn test_quote_and_paren_count_as_terminal() {
        let v = verifier();
        assert!(v.is_complete("\"ship it\"", 99, 100));
        assert!(v.is_complete("(allegedly)", 99, 100));
    }
}
