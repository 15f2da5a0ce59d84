//! Participant selection for incoming messages
//!
//! Two-stage strategy: a deterministic keyword scorer picks 1-3 personas
//! offline; only when it comes up empty does a remote-assisted choice run,
//! and that in turn degrades to a single default persona on any failure.
//! Selection never errors.

use super::models::{Persona, PersonaRoster};
use crate::config::SelectionConfig;
use crate::llm::TextGenerator;
use crate::metrics::METRICS;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_PARTICIPANTS: usize = 3;
const MAX_FALLBACK_PARTICIPANTS: usize = 2;

/// Scores persona relevance and picks who answers
pub struct ParticipantSelector {
    roster: Arc<PersonaRoster>,
    generator: Arc<dyn TextGenerator>,
    config: SelectionConfig,
}

impl ParticipantSelector {
    pub fn new(
        roster: Arc<PersonaRoster>,
        generator: Arc<dyn TextGenerator>,
        config: SelectionConfig,
    ) -> Self {
        Self {
            roster,
            generator,
            config,
        }
    }

    /// Choose 1-3 persona names for the message, most relevant first
    pub async fn select(&self, message: &str) -> Vec<String> {
        let scored = self.score_personas(message);

        let mut selected: Vec<String> = Vec::with_capacity(MAX_PARTICIPANTS);

        // The top persona joins on any positive signal; the second and
        // third need progressively stronger evidence so weak signals do
        // not balloon the group.
        if let Some((name, score)) = scored.first() {
            if *score > 0.0 {
                selected.push(name.clone());
            }
        }
        if let Some((name, score)) = scored.get(1) {
            if *score >= self.config.second_threshold {
                selected.push(name.clone());
            }
        }
        if let Some((name, score)) = scored.get(2) {
            if *score >= self.config.third_threshold {
                selected.push(name.clone());
            }
        }

        if !selected.is_empty() {
            debug!(?selected, "Participants chosen by scoring");
            METRICS.record_selection("scored");
            return selected;
        }

        self.fallback(message).await
    }

    /// Relevance scores for every persona, highest first
    fn score_personas(&self, message: &str) -> Vec<(String, f64)> {
        let lowered = message.to_lowercase();

        let mut scored: Vec<(String, f64)> = self
            .roster
            .iter()
            .map(|persona| (persona.name.clone(), self.score(persona, &lowered)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    fn score(&self, persona: &Persona, lowered_message: &str) -> f64 {
        let trigger_matches = persona
            .triggers
            .iter()
            .filter(|t| lowered_message.contains(t.to_lowercase().as_str()))
            .count();
        let mut score = trigger_matches as f64 * self.config.trigger_weight;

        let role = persona.role.to_lowercase();
        for (role_key, keywords) in &self.config.role_keywords {
            if role.contains(role_key.as_str()) {
                let role_matches = keywords
                    .iter()
                    .filter(|k| lowered_message.contains(k.to_lowercase().as_str()))
                    .count();
                score += role_matches as f64 * self.config.role_weight;
            }
        }

        score * persona.weight
    }

    /// Remote-assisted choice when scoring is inconclusive
    async fn fallback(&self, message: &str) -> Vec<String> {
        let descriptions = self
            .roster
            .iter()
            .map(|p| {
                let top_triggers: Vec<&str> =
                    p.triggers.iter().take(3).map(|t| t.as_str()).collect();
                format!("- {} ({}): {}", p.name, p.role, top_triggers.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Given this message: \"{}\"\n\n\
             Available specialists:\n{}\n\n\
             Who would be MOST relevant? Consider primary expertise match and \
             the actual value they could provide.\n\
             Return 1-2 names maximum, comma-separated, using exact names from the list.",
            message, descriptions
        );

        match self
            .generator
            .generate(None, &prompt, self.config.fallback_max_tokens)
            .await
        {
            Ok(reply) => {
                METRICS.record_remote_call("selector", true);
                let matched = self.parse_names(&reply);
                if matched.is_empty() {
                    debug!(reply, "Fallback reply matched no known persona");
                    METRICS.record_selection("default");
                    self.default_choice()
                } else {
                    METRICS.record_selection("fallback");
                    matched
                }
            }
            Err(e) => {
                METRICS.record_remote_call("selector", false);
                warn!("Selector fallback failed, using default persona: {}", e);
                METRICS.record_selection("default");
                self.default_choice()
            }
        }
    }

    /// Match a comma-separated reply against roster names, keeping reply order
    fn parse_names(&self, reply: &str) -> Vec<String> {
        let mut matched = Vec::new();
        for candidate in reply.split(',') {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            if let Some(persona) = self.roster.get(candidate) {
                if !matched.contains(&persona.name) {
                    matched.push(persona.name.clone());
                }
            }
            if matched.len() == MAX_FALLBACK_PARTICIPANTS {
                break;
            }
        }
        matched
    }

    fn default_choice(&self) -> Vec<String> {
        self.roster
            .get(&self.config.default_persona)
            .or_else(|| self.roster.first())
            .map(|p| vec![p.name.clone()])
            .unwrap_or_default()
    }
}
