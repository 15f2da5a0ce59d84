//! Persona configuration and participation policy
//!
//! Personas are configuration data: the engine reads their triggers,
//! weights, and prompt templates but never mutates them. The selector
//! decides who answers a message, the interjection policy decides who may
//! jump in uninvited, and the banter policy produces quick reactions
//! between colleagues.

pub mod banter;
pub mod interjection;
pub mod models;
pub mod selector;

pub use banter::BanterPolicy;
pub use interjection::InterjectionPolicy;
pub use models::{Persona, PersonaRoster};
pub use selector::ParticipantSelector;
