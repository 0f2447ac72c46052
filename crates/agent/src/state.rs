//! State-Based Dialog Management
//!
//! Each member of [`DialogueState`] has a stateless handler implementing
//! two operations: choosing the next state for an utterance, and running
//! the entry actions when the state is entered. Handlers own no data; all
//! mutable data lives in the [`DialogueContext`] passed to them.
//!
//! | State | next state | entry actions |
//! |---|---|---|
//! | Start | Routing | welcome + instructions |
//! | Routing | "symptom" → IdentifyCondition, no "medication"/"disease" → Start, else Routing | none |
//! | IdentifyCondition | ReportTreatment | extract symptoms, resolve condition, record turns |
//! | ReportTreatment | ReportTreatment | look up treatment for the stored condition |
//! | End | End | closing message |

use medbot_config::DialogueConfig;
use medbot_core::{
    DialogueContext, DialogueState, EntityValue, Goal, DISEASE_ENTITY, NO_KNOWN_TREATMENT,
    SYMPTOMS_ENTITY, UNKNOWN_DISEASE,
};

use crate::keywords::ExitMatcher;
use crate::machine::Capabilities;

const SYMPTOM_KEYWORD: &str = "symptom";
const TOPIC_KEYWORDS: [&str; 2] = ["medication", "disease"];

/// What a handler can see besides the utterance and the context
pub struct StateEnv<'a> {
    pub capabilities: &'a Capabilities,
    pub dialogue: &'a DialogueConfig,
    pub exits: &'a ExitMatcher,
}

/// Handler for one conversation state
pub trait ConversationState: Send + Sync {
    /// The state this handler implements
    fn id(&self) -> DialogueState;

    /// Choose the state to move to for `input`
    fn next_state(&self, input: &str, env: &StateEnv<'_>) -> DialogueState;

    /// Run the entry actions, returning the message to emit, if any
    fn execute_actions(
        &self,
        input: &str,
        context: &mut DialogueContext,
        env: &StateEnv<'_>,
    ) -> Option<String>;
}

pub struct StartState;
pub struct RoutingState;
pub struct IdentifyConditionState;
pub struct ReportTreatmentState;
pub struct EndState;

static START: StartState = StartState;
static ROUTING: RoutingState = RoutingState;
static IDENTIFY_CONDITION: IdentifyConditionState = IdentifyConditionState;
static REPORT_TREATMENT: ReportTreatmentState = ReportTreatmentState;
static END: EndState = EndState;

/// Dispatch table from state identifier to its handler
pub fn handler_for(state: DialogueState) -> &'static dyn ConversationState {
    match state {
        DialogueState::Start => &START,
        DialogueState::Routing => &ROUTING,
        DialogueState::IdentifyCondition => &IDENTIFY_CONDITION,
        DialogueState::ReportTreatment => &REPORT_TREATMENT,
        DialogueState::End => &END,
    }
}

impl ConversationState for StartState {
    fn id(&self) -> DialogueState {
        DialogueState::Start
    }

    fn next_state(&self, _input: &str, _env: &StateEnv<'_>) -> DialogueState {
        DialogueState::Routing
    }

    fn execute_actions(
        &self,
        _input: &str,
        _context: &mut DialogueContext,
        env: &StateEnv<'_>,
    ) -> Option<String> {
        Some(format!(
            "{} {}",
            env.dialogue.welcome_message, env.dialogue.instructions
        ))
    }
}

impl ConversationState for RoutingState {
    fn id(&self) -> DialogueState {
        DialogueState::Routing
    }

    fn next_state(&self, input: &str, env: &StateEnv<'_>) -> DialogueState {
        if env.exits.matches(input) {
            return DialogueState::End;
        }

        let lower = input.to_lowercase();
        if lower.contains(SYMPTOM_KEYWORD) {
            DialogueState::IdentifyCondition
        } else if !TOPIC_KEYWORDS.iter().any(|k| lower.contains(k)) {
            DialogueState::Start
        } else {
            DialogueState::Routing
        }
    }

    fn execute_actions(
        &self,
        _input: &str,
        _context: &mut DialogueContext,
        _env: &StateEnv<'_>,
    ) -> Option<String> {
        None
    }
}

impl ConversationState for IdentifyConditionState {
    fn id(&self) -> DialogueState {
        DialogueState::IdentifyCondition
    }

    fn next_state(&self, _input: &str, _env: &StateEnv<'_>) -> DialogueState {
        DialogueState::ReportTreatment
    }

    fn execute_actions(
        &self,
        input: &str,
        context: &mut DialogueContext,
        env: &StateEnv<'_>,
    ) -> Option<String> {
        let symptoms = match env.capabilities.extractor.extract(input) {
            Ok(symptoms) => symptoms,
            Err(e) => {
                tracing::warn!(error = %e, "Symptom extraction failed, continuing without symptoms");
                metrics::counter!("medbot_degraded_total", "collaborator" => "symptom_extractor")
                    .increment(1);
                Vec::new()
            },
        };

        let disease = match env.capabilities.resolver.resolve(&symptoms) {
            Ok(disease) if !disease.trim().is_empty() => disease,
            Ok(_) => UNKNOWN_DISEASE.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Condition resolution failed, using sentinel");
                metrics::counter!("medbot_degraded_total", "collaborator" => "condition_resolver")
                    .increment(1);
                UNKNOWN_DISEASE.to_string()
            },
        };

        tracing::debug!(
            disease = %disease,
            symptom_count = symptoms.len(),
            "Identified condition"
        );

        let symptom_list = if symptoms.is_empty() {
            "none identified".to_string()
        } else {
            symptoms.join(", ")
        };

        context.set_active_goal(Some(Goal::Diagnose));
        context.add_identified_entity(DISEASE_ENTITY, disease.clone());
        context.add_identified_entity(SYMPTOMS_ENTITY, symptoms);

        let response = format!(
            "I believe you may have {} based on the symptoms: {}. \
             Let me provide information about the medication.",
            disease, symptom_list
        );

        context.add_user_utterance(input);
        context.add_system_utterance(response.clone());

        Some(response)
    }
}

impl ConversationState for ReportTreatmentState {
    fn id(&self) -> DialogueState {
        DialogueState::ReportTreatment
    }

    fn next_state(&self, input: &str, env: &StateEnv<'_>) -> DialogueState {
        if env.exits.matches(input) {
            DialogueState::End
        } else {
            DialogueState::ReportTreatment
        }
    }

    fn execute_actions(
        &self,
        _input: &str,
        context: &mut DialogueContext,
        env: &StateEnv<'_>,
    ) -> Option<String> {
        let disease = context
            .entity(DISEASE_ENTITY)
            .and_then(EntityValue::as_text)
            .unwrap_or(UNKNOWN_DISEASE)
            .to_string();

        let treatment = match env.capabilities.lookup.lookup(&disease) {
            Ok(treatment) if !treatment.trim().is_empty() => treatment,
            Ok(_) => NO_KNOWN_TREATMENT.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, disease = %disease, "Treatment lookup failed, using sentinel");
                metrics::counter!("medbot_degraded_total", "collaborator" => "treatment_lookup")
                    .increment(1);
                NO_KNOWN_TREATMENT.to_string()
            },
        };

        let response = format!("The medication for {} is: {}", disease, treatment);

        context.set_active_goal(Some(Goal::Medicate));
        context.add_system_utterance(response.clone());

        Some(response)
    }
}

impl ConversationState for EndState {
    fn id(&self) -> DialogueState {
        DialogueState::End
    }

    fn next_state(&self, _input: &str, _env: &StateEnv<'_>) -> DialogueState {
        DialogueState::End
    }

    fn execute_actions(
        &self,
        _input: &str,
        context: &mut DialogueContext,
        env: &StateEnv<'_>,
    ) -> Option<String> {
        context.set_active_goal(None);
        Some(env.dialogue.closing_message.clone())
    }
}
