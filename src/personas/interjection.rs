//! Unsolicited-remark policy for personas not selected this round

use super::models::Persona;
use crate::config::SelectionConfig;
use crate::llm::TextGenerator;
use crate::metrics::METRICS;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// How many trailing context lines are inspected
const RECENT_LINES: usize = 10;

/// Decides whether a bystander persona jumps into the conversation.
///
/// Trigger words plus an open question or problem in recent context mean an
/// unconditional interjection. Trigger words alone escalate to a small
/// remote probe. No trigger words, no interjection, ever.
pub struct InterjectionPolicy {
    generator: Arc<dyn TextGenerator>,
    config: SelectionConfig,
}

impl InterjectionPolicy {
    pub fn new(generator: Arc<dyn TextGenerator>, config: SelectionConfig) -> Self {
        Self { generator, config }
    }

    pub async fn should_interject(
        &self,
        persona: &Persona,
        context_text: &str,
        active: &HashSet<String>,
    ) -> bool {
        if active.contains(&persona.name) {
            return false;
        }

        let lines: Vec<&str> = context_text.lines().collect();
        let recent = lines[lines.len().saturating_sub(RECENT_LINES)..].join("\n");
        let recent_lower = recent.to_lowercase();

        let expertise_mentioned = persona
            .triggers
            .iter()
            .any(|t| recent_lower.contains(t.to_lowercase().as_str()));
        if !expertise_mentioned {
            return false;
        }

        let has_problem_signal = self
            .config
            .problem_indicators
            .iter()
            .any(|indicator| recent_lower.contains(indicator.to_lowercase().as_str()));
        if has_problem_signal {
            debug!(persona = %persona.name, "Interjecting on trigger plus problem signal");
            return true;
        }

        self.probe(persona, &recent).await
    }

    /// Ask the model whether the persona has something specific to add
    async fn probe(&self, persona: &Persona, recent_context: &str) -> bool {
        let prompt = format!(
            "Recent conversation:\n{}\n\n\
             As {} ({}), do you see any technical errors, missed opportunities, \
             or important additions needed in your area of expertise?\n\n\
             Consider only if you have something VALUABLE and SPECIFIC to contribute.\n\n\
             Respond: INTERJECT (with brief reason) or SKIP",
            recent_context, persona.name, persona.role
        );

        match self
            .generator
            .generate(
                Some(&persona.personality),
                &prompt,
                self.config.interject_max_tokens,
            )
            .await
        {
            Ok(reply) => {
                METRICS.record_remote_call("interjection", true);
                reply.to_lowercase().contains("interject")
            }
            Err(e) => {
                METRICS.record_remote_call("interjection", false);
                warn!(persona = %persona.name, "Interjection probe failed: {}", e);
                false
            }
        }
    }
}
