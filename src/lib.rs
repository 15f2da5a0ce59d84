//! Multi-persona conversation orchestration with adaptive context management
//!
//! `roundtable` drives a group of scripted chat personas that take turns
//! answering a user's message through a remote text-generation API. The
//! engine decides which personas respond, how much prior dialogue each one
//! sees, when older turns get condensed into synopses, and when a truncated
//! reply needs a continuation call.

pub mod chance;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod personas;
pub mod response;
pub mod tools;

pub use config::EngineConfig;
pub use context::{ContextWindowBuilder, ConversationLog, Turn};
pub use engine::{CouncilEngine, PersonaReply, ReplyKind, RoundReport};
pub use error::{EngineError, Result};
pub use llm::TextGenerator;
pub use personas::{Persona, PersonaRoster};
