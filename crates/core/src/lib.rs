//! Core types for the medical chatbot
//!
//! This crate provides the foundational types shared by the other crates:
//! - Dialogue states, goals and transcript turns
//! - The per-session dialogue context
//! - Collaborator traits (symptom extraction, condition resolution, treatment lookup)

pub mod context;
pub mod conversation;
pub mod traits;

pub use context::{DialogueContext, EntityValue, DISEASE_ENTITY, SYMPTOMS_ENTITY};
pub use conversation::{DialogueState, Goal, Speaker, Turn};
pub use traits::{
    CollaboratorError, ConditionResolver, SymptomExtractor, TreatmentLookup, NO_KNOWN_TREATMENT,
    UNKNOWN_DISEASE,
};
