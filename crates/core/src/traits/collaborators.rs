//! Symptom extraction, condition resolution and treatment lookup

use thiserror::Error;

/// Condition label substituted when no condition can be resolved
pub const UNKNOWN_DISEASE: &str = "unknown disease";
/// Treatment text substituted when no treatment is known
pub const NO_KNOWN_TREATMENT: &str = "no known treatment";

/// Collaborator failures
///
/// These never escape a transition: entry actions replace them with the
/// sentinels above.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Collaborator failed: {0}")]
    Failed(String),
}

/// Extracts symptom mentions from raw user text
pub trait SymptomExtractor: Send + Sync {
    /// Return symptom mentions in order of appearance; may be empty
    fn extract(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Maps a set of symptoms to a condition label
pub trait ConditionResolver: Send + Sync {
    /// Return a condition label, possibly [`UNKNOWN_DISEASE`]
    fn resolve(&self, symptoms: &[String]) -> Result<String, CollaboratorError>;
}

/// Maps a condition label to a treatment description
pub trait TreatmentLookup: Send + Sync {
    /// Return a treatment description, possibly [`NO_KNOWN_TREATMENT`]
    fn lookup(&self, condition: &str) -> Result<String, CollaboratorError>;
}

impl<F> SymptomExtractor for F
where
    F: Fn(&str) -> Result<Vec<String>, CollaboratorError> + Send + Sync,
{
    fn extract(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        self(text)
    }
}

impl<F> ConditionResolver for F
where
    F: Fn(&[String]) -> Result<String, CollaboratorError> + Send + Sync,
{
    fn resolve(&self, symptoms: &[String]) -> Result<String, CollaboratorError> {
        self(symptoms)
    }
}

impl<F> TreatmentLookup for F
where
    F: Fn(&str) -> Result<String, CollaboratorError> + Send + Sync,
{
    fn lookup(&self, condition: &str) -> Result<String, CollaboratorError> {
        self(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_collaborators() {
        let extractor = |text: &str| -> Result<Vec<String>, CollaboratorError> {
            Ok(text.split_whitespace().map(String::from).collect())
        };
        assert_eq!(extractor.extract("fever cough").unwrap(), vec!["fever", "cough"]);

        let resolver = |_: &[String]| -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Unavailable("offline".into()))
        };
        let err = resolver.resolve(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Collaborator unavailable: offline");
    }
}
