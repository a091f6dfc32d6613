// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `HandleTrigger` and `on_enter`, per the workflow engine's component design.

use kandev_core::{
    ActionType, Effect, StepAction, TaskId, TaskSession, TaskSessionId, TaskSessionStatus, Trigger,
    Workflow, WorkflowStepId, MAX_STEP_VISITS,
};
use std::collections::HashMap;

/// Snapshot of the session/task data the engine needs to decide a trigger.
/// The engine never reads a store directly — the caller assembles this.
pub struct TriggerRequest<'a> {
    pub task_id: TaskId,
    pub session_id: TaskSessionId,
    pub trigger: Trigger,
    pub workflow: &'a Workflow,
    pub current_step_id: WorkflowStepId,
    /// When true, compute the decision but the caller will not commit it
    /// (used by dry-run / preview callers; changes nothing about the logic).
    pub evaluate_only: bool,
}

/// The engine's decision for one fired trigger.
#[derive(Debug, Default)]
pub struct TriggerOutcome {
    pub transitioned: bool,
    pub from_step_id: Option<WorkflowStepId>,
    pub to_step_id: Option<WorkflowStepId>,
    pub side_effects: Vec<Effect>,
}

/// Evaluate a trigger against the current step's action lists.
///
/// `on_turn_complete` evaluates both side-effect and transition actions;
/// `on_turn_start` evaluates transition actions only (side effects on
/// turn-start are not recognized by this engine); `on_enter`/`on_exit` are
/// not handled here — see [`on_enter_effects`] for the post-commit half of
/// `on_enter`, and [`exit_effects`] for `on_exit`.
pub fn handle_trigger(req: TriggerRequest<'_>) -> TriggerOutcome {
    let Some(current_step) = req.workflow.step(&req.current_step_id) else {
        tracing::warn!(step_id = %req.current_step_id, "handle_trigger: current step not found in workflow");
        return TriggerOutcome::default();
    };

    let actions = current_step.events.for_trigger(req.trigger);
    let recognize_side_effects = matches!(req.trigger, Trigger::OnTurnComplete);

    let mut side_effects = Vec::new();
    let mut winner: Option<&StepAction> = None;

    for action in actions {
        if action.action_type.is_transition() {
            if winner.is_none() && !action.requires_approval() {
                winner = Some(action);
            }
            continue;
        }
        if recognize_side_effects {
            if let Some(effect) = side_effect_for(&req.session_id, action) {
                side_effects.push(effect);
            }
        }
    }

    let Some(winning_action) = winner else {
        return TriggerOutcome { transitioned: false, from_step_id: None, to_step_id: None, side_effects };
    };

    let target = resolve_target(req.workflow, &req.current_step_id, winning_action);
    match target {
        Some(to_step_id) => TriggerOutcome {
            transitioned: true,
            from_step_id: Some(req.current_step_id),
            to_step_id: Some(to_step_id),
            side_effects,
        },
        None => TriggerOutcome { transitioned: false, from_step_id: None, to_step_id: None, side_effects },
    }
}

fn side_effect_for(session_id: &TaskSessionId, action: &StepAction) -> Option<Effect> {
    match action.action_type {
        ActionType::DisablePlanMode => Some(Effect::SetPlanMode { session_id: session_id.clone(), enabled: false }),
        ActionType::EnablePlanMode => Some(Effect::SetPlanMode { session_id: session_id.clone(), enabled: true }),
        _ => None,
    }
}

fn resolve_target(workflow: &Workflow, current: &WorkflowStepId, action: &StepAction) -> Option<WorkflowStepId> {
    match action.action_type {
        ActionType::MoveToNext => workflow.next_step(current).map(|s| s.id.clone()),
        ActionType::MoveToPrevious => workflow.previous_step(current).map(|s| s.id.clone()),
        ActionType::MoveToStep => {
            let Some(target) = action.target_step_id() else {
                tracing::warn!("move_to_step action missing config.step_id");
                return None;
            };
            if workflow.step(&target).is_none() {
                tracing::warn!(step_id = %target, "move_to_step target not found in workflow");
                return None;
            }
            Some(target)
        }
        _ => None,
    }
}

/// Side effects to apply once a transition into `new_step` has been
/// committed by the caller. Order matters: reset must land before
/// auto-start, so the prompt hits a fresh agent session.
pub fn on_enter_effects(
    workflow: &Workflow,
    new_step_id: &WorkflowStepId,
    session: &TaskSession,
) -> Vec<Effect> {
    let Some(step) = workflow.step(new_step_id) else {
        tracing::warn!(step_id = %new_step_id, "on_enter: step not found in workflow");
        return Vec::new();
    };

    let mut effects = Vec::new();
    let has = |t: ActionType| step.events.on_enter.iter().any(|a| a.action_type == t);

    if has(ActionType::ResetAgentContext) {
        effects.push(Effect::ResetAgentContext { session_id: session.id.clone() });
    }

    if !session.is_passthrough {
        if has(ActionType::EnablePlanMode) {
            effects.push(Effect::SetPlanMode { session_id: session.id.clone(), enabled: true });
        } else {
            effects.push(Effect::SetPlanMode { session_id: session.id.clone(), enabled: false });
        }
    }

    if has(ActionType::AutoStartAgent) && !session.is_passthrough {
        let mut vars = HashMap::new();
        vars.insert("task_description", session.metadata.get("task_description").and_then(|v| v.as_str()).unwrap_or(""));
        let prompt = crate::prompt::substitute(&step.prompt, &vars);

        effects.push(if session.state == TaskSessionStatus::Running {
            Effect::EnqueuePrompt { session_id: session.id.clone(), task_id: session.task_id.clone(), prompt }
        } else {
            // The caller attempts this inline with bounded backoff against
            // transient Conflict errors ("agent prompt in progress",
            // "session reset in progress"); on final failure it falls back
            // to EnqueuePrompt itself. That retry loop is I/O, so it lives
            // in the orchestrator, not here.
            Effect::SendPrompt { session_id: session.id.clone(), prompt }
        });
    }

    effects
}

/// Side effects to apply when leaving `old_step` (before the new step's
/// `on_enter` effects are computed).
pub fn exit_effects(workflow: &Workflow, old_step_id: &WorkflowStepId, session_id: &TaskSessionId) -> Vec<Effect> {
    let Some(step) = workflow.step(old_step_id) else {
        return Vec::new();
    };
    step.events
        .on_exit
        .iter()
        .filter_map(|action| side_effect_for(session_id, action))
        .collect()
}

/// Whether the orchestrator's per-session step-visit counter has crossed
/// the circuit breaker, in which case `on_enter`'s auto-start/reset effects
/// should be suppressed and the session left at WAITING_FOR_INPUT.
pub fn step_visit_exceeded(visit_count: u32) -> bool {
    visit_count >= MAX_STEP_VISITS
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
