//! Round orchestration
//!
//! One round: the user's message is appended, older turns may get
//! summarized, the selector picks 1-3 personas, and each responds in
//! selection order through the continuation controller. Because every reply
//! is appended before the next persona's window is built, later personas
//! see earlier replies in the same round. Bystanders then get an
//! interjection pass, and responders a banter pass. All of it is
//! sequential; a turn once appended is permanent.

use crate::chance::ChanceSource;
use crate::config::EngineConfig;
use crate::context::{
    CharBasedEstimator, ContextWindowBuilder, ConversationLog, ConversationSummarizer,
    TokenEstimator, Turn,
};
use crate::error::{EngineError, Result};
use crate::llm::TextGenerator;
use crate::metrics::METRICS;
use crate::personas::{
    BanterPolicy, InterjectionPolicy, ParticipantSelector, Persona, PersonaRoster,
};
use crate::response::{CompletedReply, CompletionVerifier, ResponseController};
use crate::tools::{CommandRunner, CommandTool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Who the user is in the transcript
const USER_SENDER: &str = "User";

/// Importance assigned to banter turns
const BANTER_IMPORTANCE: f64 = 0.5;

/// How a reply entered the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Selected for the round
    Primary,
    /// Jumped in uninvited
    Interjection,
    /// Quick reaction to a colleague
    Banter,
}

/// One persona contribution produced by a round
#[derive(Debug, Clone)]
pub struct PersonaReply {
    pub persona: String,
    pub text: String,
    pub is_complete: bool,
    pub kind: ReplyKind,
}

/// Per-round conversation status for callers to display
#[derive(Debug, Clone, Copy)]
pub struct RoundReport {
    pub turn_count: usize,
    pub complexity: f64,
    pub total_tokens: usize,
}

/// Orchestrates persona rounds over a shared conversation log
pub struct CouncilEngine {
    session_id: Uuid,
    config: EngineConfig,
    roster: Arc<PersonaRoster>,
    log: ConversationLog,
    estimator: Arc<dyn TokenEstimator>,
    window_builder: ContextWindowBuilder,
    summarizer: ConversationSummarizer,
    selector: ParticipantSelector,
    interjection: InterjectionPolicy,
    banter: BanterPolicy,
    responder: ResponseController,
    tools: HashMap<String, CommandTool>,
    runner: CommandRunner,
    chance: Box<dyn ChanceSource>,
    active: HashSet<String>,
}

impl CouncilEngine {
    pub fn new(
        config: EngineConfig,
        roster: PersonaRoster,
        generator: Arc<dyn TextGenerator>,
        tools: Vec<CommandTool>,
        chance: Box<dyn ChanceSource>,
    ) -> Result<Self> {
        config.validate()?;
        if roster.is_empty() {
            return Err(EngineError::Configuration(
                "persona roster is empty".to_string(),
            ));
        }

        let roster = Arc::new(roster);
        let estimator: Arc<dyn TokenEstimator> = Arc::new(CharBasedEstimator::new());

        let window_builder = ContextWindowBuilder::new(
            estimator.clone(),
            config.context.base_window,
            config.context.window_cap,
            config.context.max_context_tokens,
        );
        let summarizer = ConversationSummarizer::new(
            generator.clone(),
            config.context.summarize_every,
            config.context.summary_max_tokens,
        );
        let selector = ParticipantSelector::new(
            roster.clone(),
            generator.clone(),
            config.selection.clone(),
        );
        let interjection = InterjectionPolicy::new(generator.clone(), config.selection.clone());
        let banter = BanterPolicy::new(
            generator.clone(),
            config.flourish.banter_chance,
            config.flourish.banter_max_tokens,
        );
        let verifier = CompletionVerifier::new(
            config.response.continuation_threshold,
            config.response.transition_adverbs.clone(),
        );
        let responder = ResponseController::new(
            generator,
            estimator.clone(),
            verifier,
            config.response.max_response_tokens,
            config.response.max_attempts,
        );
        let runner = CommandRunner::new(&config.tools)?;
        let tools = tools.into_iter().map(|t| (t.name.clone(), t)).collect();
        let log = ConversationLog::new(config.context.technical_terms.clone());

        let session_id = Uuid::new_v4();
        info!(%session_id, personas = roster.len(), "Engine session started");

        Ok(Self {
            session_id,
            config,
            roster,
            log,
            estimator,
            window_builder,
            summarizer,
            selector,
            interjection,
            banter,
            responder,
            tools,
            runner,
            chance,
            active: HashSet::new(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Current conversation status
    pub fn status(&self) -> RoundReport {
        RoundReport {
            turn_count: self.log.len(),
            complexity: self.log.complexity(),
            total_tokens: self.log.total_tokens(),
        }
    }

    /// Drop all conversation state back to session start
    pub fn reset(&mut self) {
        self.log.reset();
        self.active.clear();
        info!(session_id = %self.session_id, "Conversation reset");
    }

    /// Run a full round: selection, primary replies, interjections, banter
    pub async fn run_round(&mut self, message: &str) -> Vec<PersonaReply> {
        self.append_user_turn(message);

        if self.summarizer.due(&self.log) {
            self.summarizer.maybe_summarize(&mut self.log).await;
        }

        let selected = self.selector.select(message).await;
        self.active = selected.iter().cloned().collect();
        debug!(?selected, "Round participants");

        let mut replies = Vec::new();

        for name in &selected {
            let Some(persona) = self.roster.get(name).cloned() else {
                continue;
            };
            let reply = self.persona_reply(&persona, message, false, true).await;
            self.append_persona_turn(&persona, &reply);
            replies.push(PersonaReply {
                persona: persona.name,
                text: reply.text,
                is_complete: reply.is_complete,
                kind: ReplyKind::Primary,
            });
        }

        let interjections = self.interjection_pass(message).await;
        replies.extend(interjections);

        let banter = self.banter_pass(&replies).await;
        replies.extend(banter);

        replies
    }

    /// Address one persona by (partial) name, or every persona via "all".
    ///
    /// Direct replies use a minimal context of just the current message so
    /// the target does not treat its own earlier answer as fresh input.
    pub async fn run_direct(&mut self, target: &str, message: &str) -> Result<Vec<PersonaReply>> {
        let targets: Vec<Persona> = if target.eq_ignore_ascii_case("all") {
            self.roster.iter().cloned().collect()
        } else {
            vec![self
                .roster
                .resolve(target)
                .cloned()
                .ok_or_else(|| EngineError::UnknownPersona(target.to_string()))?]
        };

        self.append_user_turn(message);
        self.active = targets.iter().map(|p| p.name.clone()).collect();

        let mut replies = Vec::with_capacity(targets.len());
        for persona in &targets {
            let reply = self.persona_reply(persona, message, true, true).await;
            self.append_persona_turn(persona, &reply);
            replies.push(PersonaReply {
                persona: persona.name.clone(),
                text: reply.text,
                is_complete: reply.is_complete,
                kind: ReplyKind::Primary,
            });
        }

        Ok(replies)
    }

    fn append_user_turn(&mut self, message: &str) {
        let tokens = self.estimator.estimate(message);
        self.log.append(Turn::new(USER_SENDER, message, tokens));
    }

    fn append_persona_turn(&mut self, persona: &Persona, reply: &CompletedReply) {
        let turn = Turn::new(&persona.name, &reply.text, reply.tokens)
            .with_importance(self.log.complexity())
            .with_completeness(reply.is_complete);
        self.log.append(turn);
    }

    /// Build context and prompt for one persona and drive the continuation
    /// protocol to a reply.
    async fn persona_reply(
        &mut self,
        persona: &Persona,
        message: &str,
        minimal_context: bool,
        allow_catchphrase: bool,
    ) -> CompletedReply {
        let (context_text, context_tokens) = if minimal_context {
            let text = format!("{}: {}", USER_SENDER, message);
            let tokens = self.estimator.estimate(&text);
            (text, tokens)
        } else {
            let window = self.window_builder.build(&self.log, Some(&persona.name));
            METRICS.record_context_window(window.tokens, window.text.lines().count());
            (window.text, window.tokens)
        };

        let tool_block = self.tool_block(persona, message, &context_text).await;
        let catchphrase = self.catchphrase(persona, allow_catchphrase);

        let prompt = format!(
            "Previous conversation:\n{context}\n\n\
             Current message: {message}\n\n\
             Context tokens used: {used}/{cap}\n\
             Conversation complexity: {complexity:.1}x\n\n\
             {tools}\
             Respond as {name}. Be {style}.\n\
             Keep it to 2-3 sentences, technically accurate, and straight to the actionable point.\n\
             If tool results are present, incorporate them naturally.{catchphrase}",
            context = context_text,
            message = message,
            used = context_tokens,
            cap = self.config.context.max_context_tokens,
            complexity = self.log.complexity(),
            tools = tool_block,
            name = persona.name,
            style = persona.interaction_style,
            catchphrase = catchphrase,
        );

        self.responder.complete_reply(persona, &prompt).await
    }

    /// Keyword-triggered command runs for this persona, as a prompt block
    async fn tool_block(&self, persona: &Persona, message: &str, context: &str) -> String {
        if persona.tools.is_empty() {
            return String::new();
        }

        let available: Vec<CommandTool> = persona
            .tools
            .iter()
            .filter_map(|name| self.tools.get(name))
            .cloned()
            .collect();

        let haystack = format!("{} {}", message, context);
        let triggered = self.runner.triggered(&available, &haystack);
        self.runner.splice_results(&triggered, message).await
    }

    fn catchphrase(&mut self, persona: &Persona, allowed: bool) -> String {
        if !allowed
            || persona.catchphrases.is_empty()
            || !self.chance.roll(self.config.flourish.catchphrase_chance)
        {
            return String::new();
        }
        let pick = self.chance.pick(persona.catchphrases.len());
        format!("\n\n*{}*", persona.catchphrases[pick])
    }

    /// Offer bystander personas a chance to jump in
    async fn interjection_pass(&mut self, message: &str) -> Vec<PersonaReply> {
        let window = self.window_builder.build(&self.log, None);

        let bystanders: Vec<Persona> = self
            .roster
            .iter()
            .filter(|p| !self.active.contains(&p.name))
            .cloned()
            .collect();

        let mut replies = Vec::new();
        for persona in bystanders {
            let should = self
                .interjection
                .should_interject(&persona, &window.text, &self.active)
                .await;
            if !should {
                continue;
            }

            info!(persona = %persona.name, "Interjection");
            METRICS.interjections.inc();

            let reply = self.persona_reply(&persona, message, false, false).await;
            self.append_persona_turn(&persona, &reply);
            self.active.insert(persona.name.clone());
            replies.push(PersonaReply {
                persona: persona.name,
                text: reply.text,
                is_complete: reply.is_complete,
                kind: ReplyKind::Interjection,
            });
        }

        replies
    }

    /// Let later responders fire a one-liner about earlier replies
    async fn banter_pass(&mut self, replies: &[PersonaReply]) -> Vec<PersonaReply> {
        if replies.len() < 2 {
            return Vec::new();
        }

        let mut remarks = Vec::new();
        for (i, earlier) in replies.iter().enumerate() {
            for later in &replies[i + 1..] {
                let (Some(from), Some(about)) = (
                    self.roster.get(&later.persona).cloned(),
                    self.roster.get(&earlier.persona).cloned(),
                ) else {
                    continue;
                };

                let remark = self
                    .banter
                    .maybe_react(self.chance.as_mut(), &from, &about, &earlier.text)
                    .await;

                if let Some(text) = remark {
                    let tokens = self.estimator.estimate(&text);
                    self.log.append(
                        Turn::new(&from.name, &text, tokens).with_importance(BANTER_IMPORTANCE),
                    );
                    remarks.push(PersonaReply {
                        persona: from.name,
                        text,
                        is_complete: true,
                        kind: ReplyKind::Banter,
                    });
                }
            }
        }

        remarks
    }
}
