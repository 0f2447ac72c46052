//! Dialogue context
//!
//! Mutable record of what the conversation has established so far: the
//! active goal, the entities extracted from user input and the ordered
//! transcript. One context exists per conversation session and is only
//! mutated by state entry actions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::conversation::{Goal, Turn};

/// Entity key for the resolved condition label
pub const DISEASE_ENTITY: &str = "disease";
/// Entity key for the extracted symptom list
pub const SYMPTOMS_ENTITY: &str = "symptoms";

/// Value of an identified entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    /// Single label
    Text(String),
    /// Ordered list of labels
    List(Vec<String>),
}

impl EntityValue {
    /// Get the value as a single label
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntityValue::Text(text) => Some(text),
            EntityValue::List(_) => None,
        }
    }

    /// Get the value as a list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            EntityValue::List(items) => Some(items),
            EntityValue::Text(_) => None,
        }
    }

    /// Whether a text value equals `needle` or a list value contains it
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            EntityValue::Text(text) => text == needle,
            EntityValue::List(items) => items.iter().any(|item| item == needle),
        }
    }
}

impl From<String> for EntityValue {
    fn from(value: String) -> Self {
        EntityValue::Text(value)
    }
}

impl From<&str> for EntityValue {
    fn from(value: &str) -> Self {
        EntityValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for EntityValue {
    fn from(value: Vec<String>) -> Self {
        EntityValue::List(value)
    }
}

impl std::fmt::Display for EntityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityValue::Text(text) => f.write_str(text),
            EntityValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Per-session dialogue context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    active_goal: Option<Goal>,
    entities: HashMap<String, EntityValue>,
    transcript: Vec<Turn>,
}

impl DialogueContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or clear) the active goal
    pub fn set_active_goal(&mut self, goal: Option<Goal>) {
        self.active_goal = goal;
    }

    /// Get the active goal
    pub fn active_goal(&self) -> Option<Goal> {
        self.active_goal
    }

    /// Insert or overwrite the entity stored under `entity_type`
    pub fn add_identified_entity(&mut self, entity_type: impl Into<String>, value: impl Into<EntityValue>) {
        self.entities.insert(entity_type.into(), value.into());
    }

    /// Get a single entity
    pub fn entity(&self, entity_type: &str) -> Option<&EntityValue> {
        self.entities.get(entity_type)
    }

    /// Get the full entity mapping
    pub fn entities(&self) -> &HashMap<String, EntityValue> {
        &self.entities
    }

    /// Append a user turn
    pub fn add_user_utterance(&mut self, text: impl Into<String>) {
        self.transcript.push(Turn::user(text));
    }

    /// Append a system turn
    pub fn add_system_utterance(&mut self, text: impl Into<String>) {
        self.transcript.push(Turn::system(text));
    }

    /// Append a pre-built turn record
    pub fn add_turn(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }

    /// Get the full transcript, oldest first
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Speaker;

    #[test]
    fn test_entity_upsert_same_value() {
        let mut ctx = DialogueContext::new();
        ctx.add_identified_entity(DISEASE_ENTITY, "flu");
        ctx.add_identified_entity(DISEASE_ENTITY, "flu");

        assert_eq!(ctx.entities().len(), 1);
        assert_eq!(ctx.entity(DISEASE_ENTITY), Some(&EntityValue::from("flu")));
    }

    #[test]
    fn test_entity_upsert_overwrites() {
        let mut ctx = DialogueContext::new();
        ctx.add_identified_entity(DISEASE_ENTITY, "flu");
        ctx.add_identified_entity(DISEASE_ENTITY, "migraine");

        assert_eq!(
            ctx.entity(DISEASE_ENTITY).and_then(EntityValue::as_text),
            Some("migraine")
        );
    }

    #[test]
    fn test_list_entity() {
        let mut ctx = DialogueContext::new();
        ctx.add_identified_entity(
            SYMPTOMS_ENTITY,
            vec!["fever".to_string(), "cough".to_string()],
        );

        let symptoms = ctx.entity(SYMPTOMS_ENTITY).unwrap();
        assert!(symptoms.contains("fever"));
        assert!(!symptoms.contains("rash"));
        assert_eq!(symptoms.to_string(), "fever, cough");
    }

    #[test]
    fn test_transcript_preserves_order() {
        let mut ctx = DialogueContext::new();
        ctx.add_user_utterance("first");
        ctx.add_system_utterance("second");
        ctx.add_turn(Turn::user("third"));
        ctx.add_system_utterance("fourth");

        let texts: Vec<_> = ctx.transcript().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third", "fourth"]);

        let speakers: Vec<_> = ctx.transcript().iter().map(|t| t.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::User, Speaker::System, Speaker::User, Speaker::System]
        );
    }

    #[test]
    fn test_goal_set_and_clear() {
        let mut ctx = DialogueContext::new();
        assert_eq!(ctx.active_goal(), None);

        ctx.set_active_goal(Some(Goal::Diagnose));
        assert_eq!(ctx.active_goal(), Some(Goal::Diagnose));

        ctx.set_active_goal(None);
        assert_eq!(ctx.active_goal(), None);
    }

    #[test]
    fn test_context_serialization() {
        let mut ctx = DialogueContext::new();
        ctx.add_identified_entity(DISEASE_ENTITY, "flu");
        ctx.add_identified_entity(SYMPTOMS_ENTITY, vec!["fever".to_string()]);

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["entities"]["disease"], "flu");
        assert_eq!(json["entities"]["symptoms"][0], "fever");
        assert!(json["active_goal"].is_null());
    }
}
