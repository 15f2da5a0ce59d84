//! Quick persona-to-persona reactions after a multi-persona round

use super::models::Persona;
use crate::chance::ChanceSource;
use crate::llm::TextGenerator;
use crate::metrics::METRICS;
use std::sync::Arc;
use tracing::warn;

const SKIP_SENTINEL: &str = "SKIP";

/// Chance-gated one-liner reactions between colleagues
pub struct BanterPolicy {
    generator: Arc<dyn TextGenerator>,
    chance: f64,
    max_tokens: usize,
}

impl BanterPolicy {
    pub fn new(generator: Arc<dyn TextGenerator>, chance: f64, max_tokens: usize) -> Self {
        Self {
            generator,
            chance,
            max_tokens,
        }
    }

    /// Maybe produce a one-sentence reaction from `from` about `about`'s
    /// reply. Declined coin flips, SKIP replies, and remote failures all
    /// yield silence.
    pub async fn maybe_react(
        &self,
        chance: &mut dyn ChanceSource,
        from: &Persona,
        about: &Persona,
        their_reply: &str,
    ) -> Option<String> {
        if !chance.roll(self.chance) {
            return None;
        }

        let prompt = format!(
            "{about} just said: \"{reply}\"\n\n\
             As {from}, do you have a quick reaction or comment to your colleague {about}?\n\
             Be sarcastic, supportive, dismissive, or whatever fits your personality.\n\
             Keep it to one punchy sentence or respond with SKIP if nothing to add.",
            about = about.name,
            from = from.name,
            reply = their_reply
        );

        match self
            .generator
            .generate(Some(&from.personality), &prompt, self.max_tokens)
            .await
        {
            Ok(reply) => {
                METRICS.record_remote_call("banter", true);
                let reply = reply.trim();
                if reply.contains(SKIP_SENTINEL) || reply.is_empty() {
                    None
                } else {
                    METRICS.banter_remarks.inc();
                    Some(reply.to_string())
                }
            }
            Err(e) => {
                METRICS.record_remote_call("banter", false);
                warn!(from = %from.name, "Banter call failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::AlwaysChance;
    use crate::llm::GenerationError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGenerator {
        reply: Result<String, ()>,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(
            &self,
            _system: Option<&str>,
            _user: &str,
            _max_tokens: usize,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(GenerationError::RateLimited),
            }
        }
    }

    fn personas() -> (Persona, Persona) {
        (
            Persona::new("Gilfoyle", "Infrastructure Administrator"),
            Persona::new("Rick", "Senior Backend Engineer"),
        )
    }

    #[tokio::test]
    async fn test_reaction_returned_when_chance_allows() {
        let (from, about) = personas();
        let policy = BanterPolicy::new(Arc::new(FixedGenerator::ok("This is garbage.")), 0.4, 60);

        let remark = policy
            .maybe_react(&mut AlwaysChance(true), &from, &about, "use microservices")
            .await;
        assert_eq!(remark.as_deref(), Some("This is garbage."));
    }

    #[tokio::test]
    async fn test_declined_coin_flip_makes_no_remote_call() {
        let (from, about) = personas();
        let generator = Arc::new(FixedGenerator::ok("This is garbage."));
        let policy = BanterPolicy::new(generator.clone(), 0.4, 60);

        let remark = policy
            .maybe_react(&mut AlwaysChance(false), &from, &about, "use microservices")
            .await;
        assert!(remark.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_skip_sentinel_yields_silence() {
        let (from, about) = personas();
        let policy = BanterPolicy::new(Arc::new(FixedGenerator::ok("SKIP")), 0.4, 60);

        let remark = policy
            .maybe_react(&mut AlwaysChance(true), &from, &about, "fine work")
            .await;
        assert!(remark.is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_yields_silence() {
        let (from, about) = personas();
        let policy = BanterPolicy::new(Arc::new(FixedGenerator::failing()), 0.4, 60);

        let remark = policy
            .maybe_react(&mut AlwaysChance(true), &from, &about, "fine work")
            .await;
        assert!(remark.is_none());
    }
}
