// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed payloads for each `action` in the outward envelope table. Each
//! request/notification pair is a plain struct; callers serialize it into
//! `Envelope::payload` and deserialize it back out with
//! `serde_json::from_value`, so the envelope itself stays untyped.

use kandev_core::{
    Message, PermissionId, PermissionOption, Task, TaskId, TaskSession, TaskSessionId, TaskSessionStatus, TurnId,
};
use serde::{Deserialize, Serialize};

/// The intent behind a `session.launch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchIntent {
    Create,
    Resume,
    Prepare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchSessionRequest {
    pub task_id: TaskId,
    pub intent: LaunchIntent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<TaskSessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_profile_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchSessionResponse {
    pub session_id: TaskSessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_execution_id: Option<String>,
    pub state: TaskSessionStatus,
    pub worktree_path: String,
    pub worktree_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTaskRequest {
    pub task_id: TaskId,
    pub session_id: TaskSessionId,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub plan_mode: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCancelRequest {
    pub session_id: TaskSessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorCompleteRequest {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStopRequest {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSessionStatusRequest {
    pub session_id: TaskSessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSessionStatusResponse {
    pub session: TaskSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatusResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorQueueRequest {
    pub session_id: TaskSessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorQueueResponse {
    pub queued: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRespondRequest {
    pub session_id: TaskSessionId,
    pub pending_id: PermissionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequestedNotification {
    pub session_id: TaskSessionId,
    pub pending_id: PermissionId,
    pub tool_call_id: String,
    pub title: String,
    pub action_type: String,
    pub options: Vec<PermissionOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessageAddedNotification {
    pub session_id: TaskSessionId,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChangedNotification {
    pub session_id: TaskSessionId,
    pub state: TaskSessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTurnStartedNotification {
    pub session_id: TaskSessionId,
    pub turn_id: TurnId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTurnCompletedNotification {
    pub session_id: TaskSessionId,
    pub turn_id: TurnId,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWaitingForInputNotification {
    pub session_id: TaskSessionId,
}

/// Every recognized `action` string. Exhaustive matching on this (rather
/// than raw `&str` comparisons) is what catches a typo'd action name at
/// compile time in the daemon's dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[serde(rename = "orchestrator.status")]
    OrchestratorStatus,
    #[serde(rename = "orchestrator.queue")]
    OrchestratorQueue,
    #[serde(rename = "orchestrator.start")]
    OrchestratorStart,
    #[serde(rename = "orchestrator.stop")]
    OrchestratorStop,
    #[serde(rename = "orchestrator.prompt")]
    OrchestratorPrompt,
    #[serde(rename = "orchestrator.complete")]
    OrchestratorComplete,
    #[serde(rename = "session.launch")]
    SessionLaunch,
    #[serde(rename = "task.session.resume")]
    TaskSessionResume,
    #[serde(rename = "task.session.prepare")]
    TaskSessionPrepare,
    #[serde(rename = "task.session.status")]
    TaskSessionStatus,
    #[serde(rename = "agent.cancel")]
    AgentCancel,
    #[serde(rename = "permission.requested")]
    PermissionRequested,
    #[serde(rename = "permission.respond")]
    PermissionRespond,
    #[serde(rename = "session.message.added")]
    SessionMessageAdded,
    #[serde(rename = "session.state_changed")]
    SessionStateChanged,
    #[serde(rename = "session.turn.started")]
    SessionTurnStarted,
    #[serde(rename = "session.turn.completed")]
    SessionTurnCompleted,
    #[serde(rename = "session.waiting_for_input")]
    SessionWaitingForInput,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::OrchestratorStatus => "orchestrator.status",
            Action::OrchestratorQueue => "orchestrator.queue",
            Action::OrchestratorStart => "orchestrator.start",
            Action::OrchestratorStop => "orchestrator.stop",
            Action::OrchestratorPrompt => "orchestrator.prompt",
            Action::OrchestratorComplete => "orchestrator.complete",
            Action::SessionLaunch => "session.launch",
            Action::TaskSessionResume => "task.session.resume",
            Action::TaskSessionPrepare => "task.session.prepare",
            Action::TaskSessionStatus => "task.session.status",
            Action::AgentCancel => "agent.cancel",
            Action::PermissionRequested => "permission.requested",
            Action::PermissionRespond => "permission.respond",
            Action::SessionMessageAdded => "session.message.added",
            Action::SessionStateChanged => "session.state_changed",
            Action::SessionTurnStarted => "session.turn.started",
            Action::SessionTurnCompleted => "session.turn.completed",
            Action::SessionWaitingForInput => "session.waiting_for_input",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = crate::WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| crate::WireError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
