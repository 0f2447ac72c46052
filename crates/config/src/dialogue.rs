//! Dialogue prompts and routing keywords

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Fixed prompts emitted by the dialogue states, plus optional exit keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Greeting emitted by the Start state
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Usage instructions emitted after the greeting
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Closing message emitted by the End state
    #[serde(default = "default_closing_message")]
    pub closing_message: String,

    /// Whole words that move Routing and ReportTreatment to End.
    /// Empty keeps End reachable only through the explicit end trigger.
    #[serde(default)]
    pub exit_keywords: Vec<String>,
}

fn default_welcome_message() -> String {
    "Welcome to the medical chatbot. I can help you find information about symptoms, \
     diseases, and medications."
        .to_string()
}

fn default_instructions() -> String {
    "To get started, please tell me about your symptoms.".to_string()
}

fn default_closing_message() -> String {
    "Thank you for using the medical chatbot. If you have more questions, feel free to ask."
        .to_string()
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            welcome_message: default_welcome_message(),
            instructions: default_instructions(),
            closing_message: default_closing_message(),
            exit_keywords: Vec::new(),
        }
    }
}

impl DialogueConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.welcome_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "dialogue.welcome_message".to_string(),
                message: "Welcome message must not be empty".to_string(),
            });
        }

        if let Some(index) = self.exit_keywords.iter().position(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("dialogue.exit_keywords[{}]", index),
                message: "Exit keywords must not be blank".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_exit_keywords_by_default() {
        let config = DialogueConfig::default();
        assert!(config.exit_keywords.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_welcome_rejected() {
        let config = DialogueConfig {
            welcome_message: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_exit_keyword_rejected() {
        let config = DialogueConfig {
            exit_keywords: vec!["bye".to_string(), "  ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
