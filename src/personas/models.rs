//! Persona configuration models

use serde::{Deserialize, Serialize};

fn default_weight() -> f64 {
    1.0
}

/// A configured conversational identity, read-only to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub role: String,
    /// Keywords whose presence in a message pulls this persona in
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Multiplier applied to this persona's selection score
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// System prompt establishing the persona's voice
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub catchphrases: Vec<String>,
    #[serde(default)]
    pub interaction_style: String,
    /// Names of local command tools this persona may draw on
    #[serde(default)]
    pub tools: Vec<String>,
}

impl Persona {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            triggers: Vec::new(),
            weight: default_weight(),
            personality: String::new(),
            catchphrases: Vec::new(),
            interaction_style: String::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_triggers(mut self, triggers: Vec<&str>) -> Self {
        self.triggers = triggers.into_iter().map(String::from).collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn with_catchphrases(mut self, catchphrases: Vec<&str>) -> Self {
        self.catchphrases = catchphrases.into_iter().map(String::from).collect();
        self
    }

    pub fn with_interaction_style(mut self, style: impl Into<String>) -> Self {
        self.interaction_style = style.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<&str>) -> Self {
        self.tools = tools.into_iter().map(String::from).collect();
        self
    }
}

/// Immutable persona collection, constructed once and shared
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaRoster {
    personas: Vec<Persona>,
}

impl PersonaRoster {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Exact name lookup, case-insensitive
    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Loose lookup for direct address: a lowercased partial name matches
    /// the first persona whose name contains it.
    pub fn resolve(&self, partial: &str) -> Option<&Persona> {
        let needle = partial.to_lowercase();
        self.personas
            .iter()
            .find(|p| p.name.to_lowercase().contains(&needle))
    }

    pub fn names(&self) -> Vec<&str> {
        self.personas.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn first(&self) -> Option<&Persona> {
        self.personas.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> PersonaRoster {
        PersonaRoster::new(vec![
            Persona::new("Gilfoyle", "Infrastructure Administrator")
                .with_triggers(vec!["server", "cloud"]),
            Persona::new("Wednesday", "Frontend Developer").with_triggers(vec!["ui", "css"]),
        ])
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let roster = roster();
        assert!(roster.get("gilfoyle").is_some());
        assert!(roster.get("GILFOYLE").is_some());
        assert!(roster.get("Dinesh").is_none());
    }

    #[test]
    fn test_resolve_partial_name() {
        let roster = roster();
        assert_eq!(roster.resolve("wed").unwrap().name, "Wednesday");
        assert!(roster.resolve("xyz").is_none());
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let persona = Persona::new("Saul", "Project Manager");
        assert_eq!(persona.weight, 1.0);
    }

    #[test]
    fn test_deserialization_fills_defaults() {
        let persona: Persona =
            serde_json::from_str(r#"{"name": "Rick", "role": "Senior Backend Engineer"}"#)
                .unwrap();
        assert_eq!(persona.weight, 1.0);
        assert!(persona.triggers.is_empty());
        assert!(persona.tools.is_empty());
    }
}
