//! Integration tests for the dialogue flow (utterance -> states -> responses)
//!
//! These tests drive full conversations through the public API.

use std::sync::Arc;

use medbot_agent::{Capabilities, DialogueStateMachine};
use medbot_config::{DialogueConfig, KnowledgeBase};
use medbot_core::{DialogueState, EntityValue, Goal, Speaker, DISEASE_ENTITY, SYMPTOMS_ENTITY};

fn machine_with(dialogue: DialogueConfig, knowledge: &KnowledgeBase) -> DialogueStateMachine {
    let capabilities = Capabilities::from_knowledge(knowledge).unwrap();
    DialogueStateMachine::new(capabilities, Arc::new(dialogue)).unwrap()
}

/// A fresh conversation reports symptoms in one turn
#[test]
fn test_fresh_symptom_report() {
    let mut machine = DialogueStateMachine::with_defaults().unwrap();

    let outcome = machine.transition("I have a symptom of fever");

    assert!(outcome.path.contains(&DialogueState::IdentifyCondition));
    assert_eq!(outcome.state, DialogueState::ReportTreatment);

    let context = machine.context();
    assert!(context.entity(SYMPTOMS_ENTITY).unwrap().contains("fever"));
    assert_eq!(
        context.entity(DISEASE_ENTITY).and_then(EntityValue::as_text),
        Some("flu")
    );
}

/// Greeting, clarification, then symptoms
#[test]
fn test_multi_turn_conversation() {
    let mut machine = DialogueStateMachine::with_defaults().unwrap();

    let outcome = machine.transition("hi there");
    assert_eq!(outcome.state, DialogueState::Start);
    assert!(outcome.reply().contains("Welcome"));

    let outcome = machine.transition("what disease could I have?");
    assert_eq!(outcome.state, DialogueState::Routing);
    assert!(outcome.responses.is_empty());

    let outcome = machine.transition("my symptoms are vomiting and diarrhea");
    assert_eq!(outcome.state, DialogueState::ReportTreatment);
    assert_eq!(
        outcome.responses[1],
        "The medication for food poisoning is: oral rehydration salts and a bland diet"
    );

    let transcript = machine.context().transcript();
    let speakers: Vec<_> = transcript.iter().map(|t| t.speaker).collect();
    assert_eq!(speakers, vec![Speaker::User, Speaker::System, Speaker::System]);
    assert_eq!(transcript[0].text, "my symptoms are vomiting and diarrhea");
    assert_eq!(machine.context().active_goal(), Some(Goal::Medicate));
}

/// Empty input never faults and always moves deterministically
#[test]
fn test_empty_input_everywhere() {
    let mut machine = DialogueStateMachine::with_defaults().unwrap();

    assert_eq!(machine.transition("").state, DialogueState::Start);
    assert_eq!(machine.transition("").state, DialogueState::Start);

    machine.transition("symptom");
    assert_eq!(machine.current_state(), DialogueState::ReportTreatment);
    assert_eq!(machine.transition("").state, DialogueState::ReportTreatment);
}

/// Custom knowledge base and exit keyword
#[test]
fn test_custom_knowledge_and_exit() {
    let knowledge = KnowledgeBase::from_yaml(
        "conditions:\n  - name: gout\n    symptoms: [joint pain, swelling]\n    treatment: colchicine\n",
    )
    .unwrap();
    let dialogue = DialogueConfig {
        exit_keywords: vec!["quit".to_string()],
        ..Default::default()
    };
    let mut machine = machine_with(dialogue, &knowledge);

    let outcome = machine.transition("symptom: Joint Pain");
    assert_eq!(outcome.responses[1], "The medication for gout is: colchicine");

    let outcome = machine.transition("quit");
    assert_eq!(outcome.state, DialogueState::End);
    assert!(outcome.reply().starts_with("Thank you"));
}

/// Outcomes serialize for the HTTP layer
#[test]
fn test_outcome_serialization() {
    let mut machine = DialogueStateMachine::with_defaults().unwrap();
    let outcome = machine.transition("hello");

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["state"], "start");
    assert_eq!(json["path"][0], "routing");
    assert!(json["responses"][0].as_str().unwrap().starts_with("Welcome"));
}
