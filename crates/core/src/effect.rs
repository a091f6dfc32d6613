// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side effects the workflow engine and orchestrator hand back to a runtime
//! for execution. Kept as data rather than closures so the engine stays
//! pure and the effects are themselves loggable/testable.

use crate::permission::PermissionId;
use crate::task::{TaskId, TaskSessionId, WorkflowStepId};

/// A side effect to be executed by the orchestrator runtime.
///
/// `name()` gives a short span name for structured logging; `fields()`
/// gives the key-value pairs worth attaching to that span. Neither is
/// used for dispatch — the runtime still matches on the variant itself.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Spawn (or re-attach to) an agentctl controller for a session.
    SpawnAgentController { session_id: TaskSessionId },
    /// Restart the controller so the next prompt opens a fresh agent session.
    ResetAgentContext { session_id: TaskSessionId },
    /// Send a prompt to the agent now (session is ready).
    SendPrompt { session_id: TaskSessionId, prompt: String },
    /// Hold a prompt on the session's FIFO queue instead of sending it.
    EnqueuePrompt { session_id: TaskSessionId, task_id: TaskId, prompt: String },
    /// Cancel the agent's current turn.
    CancelAgent { session_id: TaskSessionId },
    /// Answer a pending permission request.
    RespondToPermission { session_id: TaskSessionId, permission_id: PermissionId, option_id: Option<String> },
    /// Toggle `metadata.plan_mode` on a session.
    SetPlanMode { session_id: TaskSessionId, enabled: bool },
    /// Commit a workflow step transition.
    MoveToStep { task_id: TaskId, session_id: TaskSessionId, from_step_id: WorkflowStepId, to_step_id: WorkflowStepId },
    /// Broadcast an already-serialized update to hub subscribers.
    Broadcast { scope: BroadcastScope, payload: serde_json::Value },
}

/// Who a [`Effect::Broadcast`] is addressed to.
#[derive(Debug, Clone)]
pub enum BroadcastScope {
    Task(TaskId),
    Session(TaskSessionId),
}

impl Effect {
    /// Short span name for structured logging.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SpawnAgentController { .. } => "spawn_agent_controller",
            Effect::ResetAgentContext { .. } => "reset_agent_context",
            Effect::SendPrompt { .. } => "send_prompt",
            Effect::EnqueuePrompt { .. } => "enqueue_prompt",
            Effect::CancelAgent { .. } => "cancel_agent",
            Effect::RespondToPermission { .. } => "respond_to_permission",
            Effect::SetPlanMode { .. } => "set_plan_mode",
            Effect::MoveToStep { .. } => "move_to_step",
            Effect::Broadcast { .. } => "broadcast",
        }
    }

    /// Structured fields worth logging alongside `name()`.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::SpawnAgentController { session_id } => vec![("session_id", session_id.to_string())],
            Effect::ResetAgentContext { session_id } => vec![("session_id", session_id.to_string())],
            Effect::SendPrompt { session_id, prompt } => {
                vec![("session_id", session_id.to_string()), ("prompt_len", prompt.len().to_string())]
            }
            Effect::EnqueuePrompt { session_id, task_id, .. } => {
                vec![("session_id", session_id.to_string()), ("task_id", task_id.to_string())]
            }
            Effect::CancelAgent { session_id } => vec![("session_id", session_id.to_string())],
            Effect::RespondToPermission { session_id, permission_id, option_id } => vec![
                ("session_id", session_id.to_string()),
                ("permission_id", permission_id.to_string()),
                ("option_id", option_id.clone().unwrap_or_else(|| "none".to_string())),
            ],
            Effect::SetPlanMode { session_id, enabled } => {
                vec![("session_id", session_id.to_string()), ("enabled", enabled.to_string())]
            }
            Effect::MoveToStep { task_id, session_id, from_step_id, to_step_id } => vec![
                ("task_id", task_id.to_string()),
                ("session_id", session_id.to_string()),
                ("from_step_id", from_step_id.to_string()),
                ("to_step_id", to_step_id.to_string()),
            ],
            Effect::Broadcast { scope, .. } => match scope {
                BroadcastScope::Task(id) => vec![("task_id", id.to_string())],
                BroadcastScope::Session(id) => vec![("session_id", id.to_string())],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_prompt_logs_length_not_content() {
        let effect = Effect::SendPrompt { session_id: TaskSessionId::new(), prompt: "do the thing".into() };
        let fields = effect.fields();
        assert!(fields.iter().any(|(k, v)| *k == "prompt_len" && v == "12"));
    }
}
