// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kandev_core::test_support::five_step_workflow;
use kandev_core::TaskSession;

fn request<'a>(workflow: &'a Workflow, step: &str, by_name: &HashMap<&str, WorkflowStepId>, trigger: Trigger) -> TriggerRequest<'a> {
    TriggerRequest {
        task_id: TaskId::new(),
        session_id: TaskSessionId::new(),
        trigger,
        workflow,
        current_step_id: by_name[step].clone(),
        evaluate_only: false,
    }
}

#[test]
fn on_turn_complete_advances_through_the_chain() {
    let (workflow, by_name) = five_step_workflow();

    let outcome = handle_trigger(request(&workflow, "Backlog", &by_name, Trigger::OnTurnComplete));
    assert!(outcome.transitioned);
    assert_eq!(outcome.to_step_id, Some(by_name["In Progress"].clone()));

    let outcome = handle_trigger(request(&workflow, "In Progress", &by_name, Trigger::OnTurnComplete));
    assert_eq!(outcome.to_step_id, Some(by_name["New Context"].clone()));

    let outcome = handle_trigger(request(&workflow, "New Context", &by_name, Trigger::OnTurnComplete));
    assert_eq!(outcome.to_step_id, Some(by_name["New Step"].clone()));

    let outcome = handle_trigger(request(&workflow, "New Step", &by_name, Trigger::OnTurnComplete));
    assert_eq!(outcome.to_step_id, Some(by_name["Done"].clone()));
}

#[test]
fn terminal_step_on_turn_complete_does_not_transition() {
    let (workflow, by_name) = five_step_workflow();
    let outcome = handle_trigger(request(&workflow, "Done", &by_name, Trigger::OnTurnComplete));
    assert!(!outcome.transitioned);
    assert!(outcome.to_step_id.is_none());
}

#[test]
fn on_turn_start_from_done_moves_back_to_in_progress() {
    let (workflow, by_name) = five_step_workflow();
    let outcome = handle_trigger(request(&workflow, "Done", &by_name, Trigger::OnTurnStart));
    assert!(outcome.transitioned);
    assert_eq!(outcome.to_step_id, Some(by_name["In Progress"].clone()));
}

#[test]
fn on_turn_start_does_not_recognize_side_effects() {
    let (mut workflow, by_name) = five_step_workflow();
    let step = workflow.steps.iter_mut().find(|s| s.id == by_name["Backlog"]).unwrap();
    step.events.on_turn_start.push(StepAction::new(ActionType::DisablePlanMode));

    let outcome = handle_trigger(request(&workflow, "Backlog", &by_name, Trigger::OnTurnStart));
    assert!(outcome.side_effects.is_empty());
}

#[test]
fn requires_approval_transition_is_skipped_for_the_next_one() {
    let (mut workflow, by_name) = five_step_workflow();
    let step = workflow.steps.iter_mut().find(|s| s.id == by_name["Backlog"]).unwrap();
    let mut gated = StepAction::new(ActionType::MoveToStep);
    gated.config.insert("step_id".into(), serde_json::Value::String(by_name["Done"].to_string()));
    gated.config.insert("requires_approval".into(), serde_json::Value::Bool(true));
    step.events.on_turn_complete.insert(0, gated);

    let outcome = handle_trigger(request(&workflow, "Backlog", &by_name, Trigger::OnTurnComplete));
    assert!(outcome.transitioned);
    assert_eq!(outcome.to_step_id, Some(by_name["In Progress"].clone()));
}

#[test]
fn move_to_step_with_missing_config_does_not_transition() {
    let (mut workflow, by_name) = five_step_workflow();
    let step = workflow.steps.iter_mut().find(|s| s.id == by_name["Backlog"]).unwrap();
    step.events.on_turn_complete.clear();
    step.events.on_turn_complete.push(StepAction::new(ActionType::MoveToStep));

    let outcome = handle_trigger(request(&workflow, "Backlog", &by_name, Trigger::OnTurnComplete));
    assert!(!outcome.transitioned);
}

#[test]
fn on_enter_resets_before_auto_start() {
    let (workflow, by_name) = five_step_workflow();
    let mut session = TaskSession::builder().state(TaskSessionStatus::WaitingForInput).build();
    session.metadata.insert("task_description".into(), serde_json::Value::String("fix it".into()));

    let effects = on_enter_effects(&workflow, &by_name["New Context"], &session);
    let positions: Vec<&str> = effects.iter().map(|e| e.name()).collect();
    let reset_idx = positions.iter().position(|n| *n == "reset_agent_context").unwrap();
    let prompt_idx = positions.iter().position(|n| *n == "send_prompt" || *n == "enqueue_prompt").unwrap();
    assert!(reset_idx < prompt_idx);
}

#[test]
fn on_enter_enqueues_when_session_already_running() {
    let (workflow, by_name) = five_step_workflow();
    let session = TaskSession::builder().state(TaskSessionStatus::Running).build();

    let effects = on_enter_effects(&workflow, &by_name["New Context"], &session);
    assert!(effects.iter().any(|e| matches!(e, Effect::EnqueuePrompt { .. })));
    assert!(!effects.iter().any(|e| matches!(e, Effect::SendPrompt { .. })));
}

#[test]
fn on_enter_passthrough_skips_auto_start_but_not_reset() {
    let (workflow, by_name) = five_step_workflow();
    let session = TaskSession::builder().is_passthrough(true).state(TaskSessionStatus::WaitingForInput).build();

    let effects = on_enter_effects(&workflow, &by_name["New Context"], &session);
    assert!(effects.iter().any(|e| matches!(e, Effect::ResetAgentContext { .. })));
    assert!(!effects.iter().any(|e| matches!(e, Effect::SendPrompt { .. } | Effect::EnqueuePrompt { .. })));
    assert!(!effects.iter().any(|e| matches!(e, Effect::SetPlanMode { .. })));
}

#[test]
fn on_enter_without_auto_start_action_produces_no_prompt_effect() {
    let (workflow, by_name) = five_step_workflow();
    let session = TaskSession::builder().state(TaskSessionStatus::WaitingForInput).build();

    let effects = on_enter_effects(&workflow, &by_name["New Step"], &session);
    assert!(effects.iter().any(|e| matches!(e, Effect::ResetAgentContext { .. })));
    assert!(!effects.iter().any(|e| matches!(e, Effect::SendPrompt { .. } | Effect::EnqueuePrompt { .. })));
}

#[test]
fn step_visit_circuit_breaker_trips_at_configured_threshold() {
    assert!(!step_visit_exceeded(MAX_STEP_VISITS - 1));
    assert!(step_visit_exceeded(MAX_STEP_VISITS));
}
