//! Layered configuration for the conversation engine
//!
//! Every tunable the engine consults lives here with a default matching the
//! shipped behavior: window sizing, token caps, continuation thresholds,
//! the keyword vocabularies, and the remote endpoint settings. Values are
//! layered from defaults, an optional `roundtable.toml`, and
//! `ROUNDTABLE_`-prefixed environment variables.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Remote text-generation endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Context window and summarization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard cap on tokens fed back as prior dialogue
    pub max_context_tokens: usize,
    /// Window size at complexity 1.0
    pub base_window: usize,
    /// Window size ceiling regardless of complexity
    pub window_cap: usize,
    /// Run the summarizer on every Nth appended turn
    pub summarize_every: usize,
    /// Output budget for a single synopsis request
    pub summary_max_tokens: usize,
    /// Substrings counted as technical density signals
    pub technical_terms: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 4000,
            base_window: 5,
            window_cap: 15,
            summarize_every: 10,
            summary_max_tokens: 150,
            technical_terms: vec![
                "architecture".to_string(),
                "algorithm".to_string(),
                "implementation".to_string(),
                "vulnerability".to_string(),
                "infrastructure".to_string(),
            ],
        }
    }
}

/// Response generation and continuation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Output budget per remote call
    pub max_response_tokens: usize,
    /// Fraction of the budget above which a non-terminal ending reads as a cutoff
    pub continuation_threshold: f64,
    /// Continuation attempts before giving up
    pub max_attempts: usize,
    /// Trailing adverbs treated as evidence of a mid-list cutoff
    pub transition_adverbs: Vec<String>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_response_tokens: 400,
            continuation_threshold: 0.9,
            max_attempts: 3,
            transition_adverbs: vec![
                "Additionally,".to_string(),
                "Furthermore,".to_string(),
                "However,".to_string(),
                "Also,".to_string(),
                "First,".to_string(),
                "Second,".to_string(),
                "Third,".to_string(),
                "Finally,".to_string(),
            ],
        }
    }
}

/// Participant selection and interjection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Score contribution per matched trigger keyword
    pub trigger_weight: f64,
    /// Score contribution per matched role-category keyword
    pub role_weight: f64,
    /// Minimum score for a second participant
    pub second_threshold: f64,
    /// Minimum score for a third participant
    pub third_threshold: f64,
    /// Output budget for the remote-assisted fallback
    pub fallback_max_tokens: usize,
    /// Output budget for the interjection probe
    pub interject_max_tokens: usize,
    /// Persona used when both scoring and the fallback come up empty
    pub default_persona: String,
    /// Role-name substring to keyword-list mapping for role scoring
    pub role_keywords: HashMap<String, Vec<String>>,
    /// Words that mark an open question or problem in recent context
    pub problem_indicators: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        let mut role_keywords = HashMap::new();
        role_keywords.insert(
            "infrastructure".to_string(),
            vec!["deploy", "server", "cloud", "aws", "scale", "performance"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        role_keywords.insert(
            "devops".to_string(),
            vec!["ci/cd", "pipeline", "docker", "kubernetes", "build", "deploy"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        role_keywords.insert(
            "backend".to_string(),
            vec!["api", "database", "service", "logic", "algorithm", "data"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        role_keywords.insert(
            "frontend".to_string(),
            vec!["ui", "user", "interface", "design", "component", "react"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        role_keywords.insert(
            "security".to_string(),
            vec!["security", "auth", "vulnerability", "hack", "breach", "encrypt"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        role_keywords.insert(
            "project".to_string(),
            vec!["deadline", "timeline", "budget", "client", "planning", "meeting"]
                .into_iter()
                .map(String::from)
                .collect(),
        );

        Self {
            trigger_weight: 2.0,
            role_weight: 1.5,
            second_threshold: 1.0,
            third_threshold: 2.0,
            fallback_max_tokens: 30,
            interject_max_tokens: 30,
            default_persona: String::new(),
            role_keywords,
            problem_indicators: vec![
                "how", "why", "what", "issue", "problem", "error", "help", "?",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Side-flourish settings (catchphrases, inter-persona banter)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlourishConfig {
    /// Probability of appending a catchphrase instruction to a prompt
    pub catchphrase_chance: f64,
    /// Probability of a responder reacting to a colleague's reply
    pub banter_chance: f64,
    /// Output budget for a banter remark
    pub banter_max_tokens: usize,
}

impl Default for FlourishConfig {
    fn default() -> Self {
        Self {
            catchphrase_chance: 0.2,
            banter_chance: 0.4,
            banter_max_tokens: 60,
        }
    }
}

/// Local command execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Per-command timeout in seconds
    pub timeout_secs: u64,
    /// Commands must match one of these patterns when safe mode is on
    pub allowed_patterns: Vec<String>,
    /// Tool runs spliced into a single response at most
    pub max_tools_per_response: usize,
    /// Tool output clipped to this many characters before splicing
    pub output_clip_chars: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            allowed_patterns: vec![
                r"^aws (--version|sts get-caller-identity|ec2 describe-regions).*".to_string(),
                r"^kubectl (version|get pods|get nodes|cluster-info).*".to_string(),
                r"^curl -s -I https?://.*".to_string(),
                r"^dig [a-zA-Z0-9.-]+ ?.*".to_string(),
                r"^nslookup [a-zA-Z0-9.-]+.*".to_string(),
            ],
            max_tools_per_response: 2,
            output_clip_chars: 500,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub llm: LlmConfig,
    pub context: ContextConfig,
    pub response: ResponseConfig,
    pub selection: SelectionConfig,
    pub flourish: FlourishConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from `roundtable.toml` (optional) and environment
    /// variables prefixed with `ROUNDTABLE_` (e.g. `ROUNDTABLE_LLM__MODEL`).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("roundtable").required(false))
            .add_source(
                config::Environment::with_prefix("ROUNDTABLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: EngineConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the configuration is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.context.base_window == 0 {
            return Err(EngineError::Configuration(
                "context.base_window must be at least 1".to_string(),
            ));
        }
        if self.context.window_cap < self.context.base_window {
            return Err(EngineError::Configuration(format!(
                "context.window_cap {} below base_window {}",
                self.context.window_cap, self.context.base_window
            )));
        }
        if self.response.max_attempts == 0 {
            return Err(EngineError::Configuration(
                "response.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.response.continuation_threshold) {
            return Err(EngineError::Configuration(format!(
                "response.continuation_threshold {} outside [0, 1]",
                self.response.continuation_threshold
            )));
        }
        Ok(())
    }
}
