//! Conversation context management
//!
//! This module owns the hard part of the system: deciding what slice of
//! prior dialogue each model call sees. Turns accumulate in an append-only
//! log; a complexity score over recent turns sizes the context window; older
//! spans get condensed into synopses so unbounded conversations stay within
//! a fixed token budget.

pub mod complexity;
pub mod conversation;
pub mod models;
pub mod summarizer;
pub mod token_estimator;
pub mod window;

pub use complexity::ComplexityTracker;
pub use conversation::ConversationLog;
pub use models::Turn;
pub use summarizer::ConversationSummarizer;
pub use token_estimator::{CharBasedEstimator, TokenEstimator};
pub use window::{ContextWindow, ContextWindowBuilder};
