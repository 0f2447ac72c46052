//! Conversation types including states, goals and turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation states of the medical dialogue
///
/// The set is closed: every handler returns one of these values, so the
/// transition graph has no dangling targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Welcome and usage instructions
    #[default]
    Start,
    /// Buffer state that classifies the utterance before committing to a goal
    Routing,
    /// Symptom extraction and condition resolution
    IdentifyCondition,
    /// Treatment report for the identified condition
    ReportTreatment,
    /// Closing message; only loops back to itself
    End,
}

impl DialogueState {
    /// Every member of the enumeration, in flow order
    pub const ALL: [DialogueState; 5] = [
        DialogueState::Start,
        DialogueState::Routing,
        DialogueState::IdentifyCondition,
        DialogueState::ReportTreatment,
        DialogueState::End,
    ];

    /// Get state display name
    pub fn display_name(&self) -> &'static str {
        match self {
            DialogueState::Start => "Start",
            DialogueState::Routing => "Routing",
            DialogueState::IdentifyCondition => "Identify Condition",
            DialogueState::ReportTreatment => "Report Treatment",
            DialogueState::End => "End",
        }
    }

    /// Stable snake_case identifier, used for metric labels and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Start => "start",
            DialogueState::Routing => "routing",
            DialogueState::IdentifyCondition => "identify_condition",
            DialogueState::ReportTreatment => "report_treatment",
            DialogueState::End => "end",
        }
    }

    /// Transient states hand the same utterance on to the next state
    /// within a single `transition` call.
    pub fn is_transient(&self) -> bool {
        matches!(self, DialogueState::Routing | DialogueState::IdentifyCondition)
    }
}

impl std::fmt::Display for DialogueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Conversational objective currently pursued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Working out which condition matches the reported symptoms
    Diagnose,
    /// Reporting a treatment for the identified condition
    Medicate,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Diagnose => "diagnose",
            Goal::Medicate => "medicate",
        }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// Patient/user message
    User,
    /// Chatbot message
    System,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::System => "system",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single turn in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it
    pub speaker: Speaker,
    /// What was said
    pub text: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    /// Create a system turn
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Speaker::System, text)
    }
}
