//! Condition knowledge base
//!
//! Table of conditions, the symptoms that indicate them and a treatment
//! description. Loaded from YAML:
//!
//! ```yaml
//! conditions:
//!   - name: flu
//!     symptoms: [fever, chills, body ache, cough]
//!     treatment: "rest, fluids and paracetamol for fever"
//! ```
//!
//! When no file is configured the built-in table is used.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::ConfigError;

/// One condition and what is known about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionEntry {
    /// Condition label
    pub name: String,
    /// Indicative symptoms
    pub symptoms: Vec<String>,
    /// Treatment description
    pub treatment: String,
}

impl ConditionEntry {
    fn new(name: &str, symptoms: &[&str], treatment: &str) -> Self {
        Self {
            name: name.to_string(),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            treatment: treatment.to_string(),
        }
    }
}

/// Knowledge base of conditions, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub conditions: Vec<ConditionEntry>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            conditions: vec![
                ConditionEntry::new(
                    "flu",
                    &["fever", "chills", "body ache", "cough", "fatigue"],
                    "rest, plenty of fluids and paracetamol for fever",
                ),
                ConditionEntry::new(
                    "common cold",
                    &["runny nose", "sneezing", "sore throat", "cough"],
                    "rest, warm fluids and saline nasal spray",
                ),
                ConditionEntry::new(
                    "migraine",
                    &["headache", "nausea", "sensitivity to light", "dizziness"],
                    "ibuprofen or a triptan, and rest in a dark room",
                ),
                ConditionEntry::new(
                    "food poisoning",
                    &["nausea", "vomiting", "diarrhea", "stomach cramps"],
                    "oral rehydration salts and a bland diet",
                ),
                ConditionEntry::new(
                    "allergic rhinitis",
                    &["sneezing", "itchy eyes", "runny nose", "congestion"],
                    "antihistamines such as cetirizine",
                ),
                ConditionEntry::new(
                    "strep throat",
                    &["sore throat", "fever", "swollen glands"],
                    "a course of antibiotics prescribed by a doctor",
                ),
            ],
        }
    }
}

impl KnowledgeBase {
    /// Load the knowledge base from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ParseError(format!("Failed to read knowledge base: {}", e))
        })?;
        let knowledge = Self::from_yaml(&content)?;

        tracing::debug!(
            path = %path.display(),
            conditions = knowledge.conditions.len(),
            "Loaded knowledge base"
        );
        Ok(knowledge)
    }

    /// Parse and validate a knowledge base from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let knowledge: KnowledgeBase = serde_yaml::from_str(content)?;
        knowledge.validate()?;
        Ok(knowledge)
    }

    /// Validate the table
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.conditions.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "conditions[{}].name",
                    index
                )));
            }
            if !seen.insert(entry.name.to_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("conditions[{}].name", index),
                    message: format!("Duplicate condition '{}'", entry.name),
                });
            }
            if entry.symptoms.iter().all(|s| s.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("conditions[{}].symptoms", index),
                    message: format!("Condition '{}' has no symptoms", entry.name),
                });
            }
        }
        Ok(())
    }

    /// Every distinct symptom, lowercased, in first-seen order
    pub fn symptom_vocabulary(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.conditions
            .iter()
            .flat_map(|entry| entry.symptoms.iter())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect()
    }
}
