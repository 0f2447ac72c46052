//! Core traits for pluggable collaborators
//!
//! The dialogue core never does its own language understanding or medical
//! lookups. It consumes these capabilities through traits so that a
//! deterministic table can stand in during tests and a real NLP or lookup
//! service can be wired in production.

mod collaborators;

pub use collaborators::{
    CollaboratorError, ConditionResolver, SymptomExtractor, TreatmentLookup, NO_KNOWN_TREATMENT,
    UNKNOWN_DISEASE,
};
