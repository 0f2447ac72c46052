//! Dialogue Agent
//!
//! Features:
//! - State-based dialog management over a closed set of states
//! - Settling transitions (one user turn may pass through transient states)
//! - Injected collaborators for symptom extraction, condition resolution
//!   and treatment lookup
//! - Knowledge-table collaborators for tests and default deployments

pub mod keywords;
pub mod knowledge;
pub mod machine;
pub mod state;

pub use keywords::ExitMatcher;
pub use knowledge::{KeywordSymptomExtractor, KnowledgeConditionResolver, KnowledgeTreatmentLookup};
pub use machine::{Capabilities, DialogueStateMachine, StepOutcome, TransitionOutcome};
pub use state::{handler_for, ConversationState, StateEnv};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Knowledge error: {0}")]
    Knowledge(String),
}
