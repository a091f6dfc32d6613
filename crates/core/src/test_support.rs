// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures, exported to other crates behind `test-support`.

use crate::task::{ActionType, StepAction, StepEvents, Workflow, WorkflowId, WorkflowStep, WorkflowStepId};
use std::collections::HashMap;

/// The 5-step workflow used by the engine scenarios: "Backlog", "In
/// Progress", "New Context", "New Step", "Done", at positions 0..4, wired
/// up the way the recognized action types table describes. Returns the
/// workflow plus a name→id map for scenario authors.
pub fn five_step_workflow() -> (Workflow, HashMap<&'static str, WorkflowStepId>) {
    let workflow_id = WorkflowId::new();
    let names = ["Backlog", "In Progress", "New Context", "New Step", "Done"];
    let ids: Vec<WorkflowStepId> = names.iter().map(|_| WorkflowStepId::new()).collect();
    let mut by_name = HashMap::new();
    for (name, id) in names.iter().zip(ids.iter()) {
        by_name.insert(*name, id.clone());
    }

    let mut steps = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let mut events = StepEvents::default();
        match *name {
            "Backlog" => {
                events.on_turn_complete.push(StepAction::new(ActionType::MoveToNext));
            }
            "In Progress" => {
                events.on_turn_complete.push(StepAction::new(ActionType::MoveToNext));
            }
            "New Context" => {
                events.on_enter.push(StepAction::new(ActionType::ResetAgentContext));
                events.on_enter.push(StepAction::new(ActionType::AutoStartAgent));
                events.on_turn_complete.push(StepAction::new(ActionType::MoveToNext));
            }
            "New Step" => {
                events.on_enter.push(StepAction::new(ActionType::ResetAgentContext));
                events.on_turn_complete.push(StepAction::new(ActionType::MoveToNext));
            }
            "Done" => {
                events.on_turn_start.push(move_to_step(&ids[1]));
            }
            _ => unreachable!(),
        }

        steps.push(WorkflowStep {
            id: ids[i].clone(),
            workflow_id: workflow_id.clone(),
            position: i as i64,
            name: name.to_string(),
            color: "#888888".to_string(),
            prompt: format!("continue at {name}: {{task_description}}"),
            events,
            allow_manual_move: true,
            auto_archive_after_hours: None,
        });
    }

    (Workflow { id: workflow_id, name: "five-step".to_string(), steps }, by_name)
}

fn move_to_step(target: &WorkflowStepId) -> StepAction {
    let mut action = StepAction::new(ActionType::MoveToStep);
    action.config.insert("step_id".to_string(), serde_json::Value::String(target.to_string()));
    action
}
