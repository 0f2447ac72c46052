//! Dialogue State Machine
//!
//! Holds the current state and the session's [`DialogueContext`]. Each
//! step asks the current state's handler for the next state, commits it,
//! then runs the entered state's entry actions.
//!
//! [`DialogueStateMachine::transition`] keeps stepping with the same
//! utterance while the machine sits in a transient state, so a single
//! user turn can pass through `Routing` and `IdentifyCondition` and come
//! to rest in `ReportTreatment`.

use serde::Serialize;
use std::sync::Arc;

use medbot_config::{DialogueConfig, KnowledgeBase};
use medbot_core::{
    ConditionResolver, DialogueContext, DialogueState, SymptomExtractor, TreatmentLookup,
};

use crate::keywords::ExitMatcher;
use crate::knowledge::{KeywordSymptomExtractor, KnowledgeConditionResolver, KnowledgeTreatmentLookup};
use crate::state::{handler_for, StateEnv};
use crate::AgentError;

/// Collaborators injected into the machine
#[derive(Clone)]
pub struct Capabilities {
    pub extractor: Arc<dyn SymptomExtractor>,
    pub resolver: Arc<dyn ConditionResolver>,
    pub lookup: Arc<dyn TreatmentLookup>,
}

impl Capabilities {
    pub fn new(
        extractor: Arc<dyn SymptomExtractor>,
        resolver: Arc<dyn ConditionResolver>,
        lookup: Arc<dyn TreatmentLookup>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            lookup,
        }
    }

    /// Build the table-driven collaborators from a knowledge base
    pub fn from_knowledge(knowledge: &KnowledgeBase) -> Result<Self, AgentError> {
        Ok(Self {
            extractor: Arc::new(KeywordSymptomExtractor::from_knowledge(knowledge)?),
            resolver: Arc::new(KnowledgeConditionResolver::from_knowledge(knowledge)),
            lookup: Arc::new(KnowledgeTreatmentLookup::from_knowledge(knowledge)),
        })
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

/// Result of a single committed hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub from: DialogueState,
    pub to: DialogueState,
    pub response: Option<String>,
}

impl StepOutcome {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Result of one user turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// State the machine came to rest in
    pub state: DialogueState,
    /// Every state entered during the turn, in order
    pub path: Vec<DialogueState>,
    /// Every message emitted during the turn, in order
    pub responses: Vec<String>,
}

impl TransitionOutcome {
    fn record(&mut self, step: StepOutcome) {
        self.state = step.to;
        self.path.push(step.to);
        if let Some(response) = step.response {
            self.responses.push(response);
        }
    }

    /// All responses joined into one reply
    pub fn reply(&self) -> String {
        self.responses.join("\n")
    }
}

/// Dialogue state machine for one conversation
pub struct DialogueStateMachine {
    current: DialogueState,
    context: DialogueContext,
    capabilities: Capabilities,
    dialogue: Arc<DialogueConfig>,
    exits: ExitMatcher,
}

impl DialogueStateMachine {
    /// Create a machine in the Start state with an empty context
    pub fn new(capabilities: Capabilities, dialogue: Arc<DialogueConfig>) -> Result<Self, AgentError> {
        let exits = ExitMatcher::new(&dialogue.exit_keywords)?;
        Ok(Self {
            current: DialogueState::Start,
            context: DialogueContext::new(),
            capabilities,
            dialogue,
            exits,
        })
    }

    /// Create with the built-in knowledge base and default prompts
    pub fn with_defaults() -> Result<Self, AgentError> {
        Self::new(
            Capabilities::from_knowledge(&KnowledgeBase::default())?,
            Arc::new(DialogueConfig::default()),
        )
    }

    /// Current state
    pub fn current_state(&self) -> DialogueState {
        self.current
    }

    /// Read access to the dialogue context
    pub fn context(&self) -> &DialogueContext {
        &self.context
    }

    /// Perform exactly one transition and its entry actions
    pub fn step(&mut self, input: &str) -> StepOutcome {
        let from = self.current;
        let to = {
            let env = StateEnv {
                capabilities: &self.capabilities,
                dialogue: &self.dialogue,
                exits: &self.exits,
            };
            handler_for(from).next_state(input, &env)
        };

        let response = self.enter(to, input);
        StepOutcome { from, to, response }
    }

    /// Process one user utterance, stepping until the machine settles
    pub fn transition(&mut self, input: &str) -> TransitionOutcome {
        let mut outcome = TransitionOutcome {
            state: self.current,
            ..Default::default()
        };

        loop {
            let step = self.step(input);
            let settled = step.is_self_loop() || !step.to.is_transient();
            outcome.record(step);
            if settled {
                break;
            }
        }

        outcome
    }

    /// Move directly to End and run its entry actions
    pub fn end(&mut self) -> TransitionOutcome {
        let mut outcome = TransitionOutcome::default();
        let from = self.current;
        let response = self.enter(DialogueState::End, "");
        outcome.record(StepOutcome {
            from,
            to: DialogueState::End,
            response,
        });
        outcome
    }

    /// Commit `to` as the current state, then run its entry actions
    fn enter(&mut self, to: DialogueState, input: &str) -> Option<String> {
        let from = self.current;
        self.current = to;

        tracing::debug!(from = %from, to = %to, "Dialogue transition");
        metrics::counter!("medbot_transitions_total", "to" => to.as_str()).increment(1);

        let env = StateEnv {
            capabilities: &self.capabilities,
            dialogue: &self.dialogue,
            exits: &self.exits,
        };
        handler_for(to).execute_actions(input, &mut self.context, &env)
    }
}

impl std::fmt::Debug for DialogueStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueStateMachine")
            .field("current", &self.current)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbot_core::{CollaboratorError, EntityValue, Goal, DISEASE_ENTITY, SYMPTOMS_ENTITY};

    fn machine() -> DialogueStateMachine {
        DialogueStateMachine::with_defaults().unwrap()
    }

    #[test]
    fn test_initial_state() {
        let machine = machine();
        assert_eq!(machine.current_state(), DialogueState::Start);
        assert!(machine.context().transcript().is_empty());
        assert!(machine.context().entities().is_empty());
    }

    #[test]
    fn test_step_commits_exactly_one_hop() {
        let mut machine = machine();
        let step = machine.step("I have a symptom of fever");

        assert_eq!(step.from, DialogueState::Start);
        assert_eq!(step.to, DialogueState::Routing);
        assert_eq!(step.response, None);
        assert_eq!(machine.current_state(), DialogueState::Routing);
    }

    #[test]
    fn test_symptom_turn_settles_in_report_treatment() {
        let mut machine = machine();
        let outcome = machine.transition("I have a symptom of fever");

        assert_eq!(
            outcome.path,
            vec![
                DialogueState::Routing,
                DialogueState::IdentifyCondition,
                DialogueState::ReportTreatment,
            ]
        );
        assert_eq!(outcome.state, DialogueState::ReportTreatment);
        assert_eq!(machine.current_state(), DialogueState::ReportTreatment);
        assert_eq!(outcome.responses.len(), 2);
        assert!(outcome.responses[0].starts_with("I believe you may have flu"));
        assert!(outcome.responses[1].starts_with("The medication for flu is:"));

        let symptoms = machine.context().entity(SYMPTOMS_ENTITY).unwrap();
        assert!(symptoms.contains("fever"));
        assert_eq!(machine.context().active_goal(), Some(Goal::Medicate));
    }

    #[test]
    fn test_greeting_turn_returns_to_start() {
        let mut machine = machine();
        let outcome = machine.transition("hello");

        assert_eq!(outcome.path, vec![DialogueState::Routing, DialogueState::Start]);
        assert_eq!(outcome.responses.len(), 1);
        assert!(outcome.reply().starts_with("Welcome"));
    }

    #[test]
    fn test_topic_turn_parks_in_routing() {
        let mut machine = machine();
        let outcome = machine.transition("tell me about medication");

        assert_eq!(outcome.path, vec![DialogueState::Routing, DialogueState::Routing]);
        assert!(outcome.responses.is_empty());
        assert_eq!(machine.current_state(), DialogueState::Routing);

        let outcome = machine.transition("");
        assert_eq!(outcome.path, vec![DialogueState::Start]);
    }

    #[test]
    fn test_report_treatment_repeats_without_advancing() {
        let mut machine = machine();
        machine.transition("symptom: headache, nausea");
        let transcript_len = machine.context().transcript().len();

        let first = machine.transition("and now?");
        let second = machine.transition("again");

        for outcome in [&first, &second] {
            assert_eq!(outcome.path, vec![DialogueState::ReportTreatment]);
            assert_eq!(outcome.responses.len(), 1);
            assert!(outcome.responses[0].contains("migraine"));
        }
        assert_eq!(machine.current_state(), DialogueState::ReportTreatment);
        assert_eq!(machine.context().transcript().len(), transcript_len + 2);
    }

    #[test]
    fn test_degraded_extractor() {
        let extractor = |_: &str| -> Result<Vec<String>, CollaboratorError> { Ok(Vec::new()) };
        let knowledge = KnowledgeBase::default();
        let capabilities = Capabilities::new(
            Arc::new(extractor),
            Arc::new(KnowledgeConditionResolver::from_knowledge(&knowledge)),
            Arc::new(KnowledgeTreatmentLookup::from_knowledge(&knowledge)),
        );
        let mut machine = DialogueStateMachine::new(capabilities, Arc::new(DialogueConfig::default())).unwrap();

        let outcome = machine.transition("symptom: something odd");

        assert_eq!(outcome.state, DialogueState::ReportTreatment);
        assert!(outcome.responses[0].contains("unknown disease"));
        assert!(outcome.responses[0].contains("none identified"));
        assert_eq!(
            machine.context().entity(SYMPTOMS_ENTITY),
            Some(&EntityValue::List(Vec::new()))
        );
    }

    #[test]
    fn test_failing_collaborators_use_sentinels() {
        let capabilities = Capabilities::new(
            Arc::new(|_: &str| -> Result<Vec<String>, CollaboratorError> {
                Err(CollaboratorError::Unavailable("nlp down".into()))
            }),
            Arc::new(|_: &[String]| -> Result<String, CollaboratorError> {
                Err(CollaboratorError::Failed("timeout".into()))
            }),
            Arc::new(|_: &str| -> Result<String, CollaboratorError> {
                Err(CollaboratorError::Unavailable("db down".into()))
            }),
        );
        let mut machine = DialogueStateMachine::new(capabilities, Arc::new(DialogueConfig::default())).unwrap();

        let outcome = machine.transition("symptom fever");

        assert_eq!(outcome.state, DialogueState::ReportTreatment);
        assert_eq!(
            machine.context().entity(DISEASE_ENTITY).and_then(EntityValue::as_text),
            Some("unknown disease")
        );
        assert_eq!(
            outcome.responses[1],
            "The medication for unknown disease is: no known treatment"
        );
    }

    #[test]
    fn test_end_trigger() {
        let mut machine = machine();
        machine.transition("symptom: cough");

        let outcome = machine.end();
        assert_eq!(outcome.path, vec![DialogueState::End]);
        assert!(outcome.reply().starts_with("Thank you for using the medical chatbot"));
        assert_eq!(machine.context().active_goal(), None);

        let outcome = machine.transition("I have a symptom");
        assert_eq!(outcome.path, vec![DialogueState::End]);
        assert_eq!(machine.current_state(), DialogueState::End);
    }

    #[test]
    fn test_exit_keyword_from_report_treatment() {
        let dialogue = DialogueConfig {
            exit_keywords: vec!["bye".to_string()],
            ..Default::default()
        };
        let capabilities = Capabilities::from_knowledge(&KnowledgeBase::default()).unwrap();
        let mut machine = DialogueStateMachine::new(capabilities, Arc::new(dialogue)).unwrap();

        machine.transition("symptom: sneezing");
        let outcome = machine.transition("ok bye");

        assert_eq!(outcome.path, vec![DialogueState::End]);
        assert_eq!(machine.current_state(), DialogueState::End);
    }

    #[test]
    fn test_words_containing_exit_keywords_keep_conversation_alive() {
        let dialogue = DialogueConfig {
            exit_keywords: vec!["bye".to_string(), "goodbye".to_string(), "quit".to_string()],
            ..Default::default()
        };
        let capabilities = Capabilities::from_knowledge(&KnowledgeBase::default()).unwrap();
        let mut machine = DialogueStateMachine::new(capabilities, Arc::new(dialogue)).unwrap();

        let outcome = machine.transition("I feel quite unwell, symptom: fever");
        assert_eq!(outcome.state, DialogueState::ReportTreatment);
        assert!(outcome.responses[0].starts_with("I believe you may have flu"));

        let outcome = machine.transition("quite");
        assert_eq!(outcome.path, vec![DialogueState::ReportTreatment]);
    }
}
