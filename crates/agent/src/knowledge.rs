//! Knowledge-table collaborators
//!
//! Deterministic implementations of the collaborator traits backed by a
//! [`KnowledgeBase`]. They stand in for real NLP and clinical lookup
//! services and are what the server wires by default.

use regex::Regex;
use std::collections::{HashMap, HashSet};

use medbot_config::KnowledgeBase;
use medbot_core::{
    CollaboratorError, ConditionResolver, SymptomExtractor, TreatmentLookup, NO_KNOWN_TREATMENT,
    UNKNOWN_DISEASE,
};

use crate::keywords::phrase_pattern;
use crate::AgentError;

/// Finds known symptom words and phrases in free text
///
/// Matching is case-insensitive on word boundaries. Longer phrases win
/// over their substrings ("sore throat" before "throat"). Mentions are
/// returned lowercased, in order of first appearance, without repeats.
#[derive(Debug, Clone)]
pub struct KeywordSymptomExtractor {
    pattern: Option<Regex>,
}

impl KeywordSymptomExtractor {
    /// Build from an explicit vocabulary
    pub fn new<I, S>(vocabulary: I) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            pattern: phrase_pattern(vocabulary)?,
        })
    }

    /// Build from the symptom vocabulary of a knowledge base
    pub fn from_knowledge(knowledge: &KnowledgeBase) -> Result<Self, AgentError> {
        Self::new(knowledge.symptom_vocabulary())
    }
}

impl SymptomExtractor for KeywordSymptomExtractor {
    fn extract(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        let Some(pattern) = &self.pattern else {
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let symptoms = pattern
            .find_iter(text)
            .map(|m| {
                m.as_str()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase()
            })
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Ok(symptoms)
    }
}

/// Resolves the condition with the largest symptom overlap
///
/// Ties go to the condition declared first; no overlap at all resolves
/// to [`UNKNOWN_DISEASE`].
#[derive(Debug, Clone)]
pub struct KnowledgeConditionResolver {
    conditions: Vec<(String, HashSet<String>)>,
}

impl KnowledgeConditionResolver {
    pub fn from_knowledge(knowledge: &KnowledgeBase) -> Self {
        let conditions = knowledge
            .conditions
            .iter()
            .map(|entry| {
                let symptoms: HashSet<String> = entry
                    .symptoms
                    .iter()
                    .map(|s| s.trim().to_lowercase())
                    .collect();
                (entry.name.clone(), symptoms)
            })
            .collect();
        Self { conditions }
    }
}

impl ConditionResolver for KnowledgeConditionResolver {
    fn resolve(&self, symptoms: &[String]) -> Result<String, CollaboratorError> {
        let reported: HashSet<String> = symptoms.iter().map(|s| s.trim().to_lowercase()).collect();

        let mut best: Option<(&str, usize)> = None;
        for (name, indicative) in &self.conditions {
            let score = indicative.intersection(&reported).count();
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((name.as_str(), score));
            }
        }

        Ok(best
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| UNKNOWN_DISEASE.to_string()))
    }
}

/// Looks up the treatment text of a condition
#[derive(Debug, Clone)]
pub struct KnowledgeTreatmentLookup {
    treatments: HashMap<String, String>,
}

impl KnowledgeTreatmentLookup {
    pub fn from_knowledge(knowledge: &KnowledgeBase) -> Self {
        let treatments = knowledge
            .conditions
            .iter()
            .map(|entry| (entry.name.trim().to_lowercase(), entry.treatment.clone()))
            .collect();
        Self { treatments }
    }
}

impl TreatmentLookup for KnowledgeTreatmentLookup {
    fn lookup(&self, condition: &str) -> Result<String, CollaboratorError> {
        Ok(self
            .treatments
            .get(&condition.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| NO_KNOWN_TREATMENT.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase::default()
    }

    #[test]
    fn test_extract_in_order_of_appearance() {
        let extractor = KeywordSymptomExtractor::from_knowledge(&knowledge()).unwrap();
        let symptoms = extractor
            .extract("I have a Sore  Throat, a fever and more fever")
            .unwrap();
        assert_eq!(symptoms, vec!["sore throat", "fever"]);
    }

    #[test]
    fn test_extract_respects_word_boundaries() {
        let extractor = KeywordSymptomExtractor::new(["ache", "cough"]).unwrap();
        assert!(extractor.extract("headache, coughing").unwrap().is_empty());
        assert_eq!(extractor.extract("an ache").unwrap(), vec!["ache"]);
    }

    #[test]
    fn test_extract_with_empty_vocabulary() {
        let extractor = KeywordSymptomExtractor::new(Vec::<String>::new()).unwrap();
        assert!(extractor.extract("fever").unwrap().is_empty());
    }

    #[test]
    fn test_resolve_largest_overlap() {
        let resolver = KnowledgeConditionResolver::from_knowledge(&knowledge());
        let symptoms = vec!["nausea".to_string(), "vomiting".to_string()];
        assert_eq!(resolver.resolve(&symptoms).unwrap(), "food poisoning");
    }

    #[test]
    fn test_resolve_tie_prefers_first_declared() {
        let resolver = KnowledgeConditionResolver::from_knowledge(&knowledge());
        // fever indicates both flu and strep throat
        assert_eq!(resolver.resolve(&["Fever".to_string()]).unwrap(), "flu");
    }

    #[test]
    fn test_resolve_unknown() {
        let resolver = KnowledgeConditionResolver::from_knowledge(&knowledge());
        assert_eq!(resolver.resolve(&[]).unwrap(), UNKNOWN_DISEASE);
        assert_eq!(
            resolver.resolve(&["itchy elbow".to_string()]).unwrap(),
            UNKNOWN_DISEASE
        );
    }

    #[test]
    fn test_lookup_treatment() {
        let lookup = KnowledgeTreatmentLookup::from_knowledge(&knowledge());
        assert_eq!(
            lookup.lookup("Migraine").unwrap(),
            "ibuprofen or a triptan, and rest in a dark room"
        );
        assert_eq!(lookup.lookup(UNKNOWN_DISEASE).unwrap(), NO_KNOWN_TREATMENT);
    }
}
