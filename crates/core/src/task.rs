// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task, TaskSession, Turn, Message, and the Workflow/WorkflowStep data model.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a task.
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Unique identifier for a task session (one execution attempt).
    pub struct TaskSessionId("tss-");
}

crate::define_id! {
    /// Unique identifier for a turn (one prompt/response cycle).
    pub struct TurnId("trn-");
}

crate::define_id! {
    /// Unique identifier for a message.
    pub struct MessageId("msg-");
}

crate::define_id! {
    /// Unique identifier for a workflow.
    pub struct WorkflowId("wfl-");
}

crate::define_id! {
    /// Unique identifier for a workflow step.
    pub struct WorkflowStepId("wfs-");
}

/// Circuit breaker on repeated visits to the same workflow step, preventing
/// a misconfigured workflow from auto-starting the agent forever. Consulted
/// by the orchestrator, not the pure engine, since only the orchestrator
/// tracks per-session visit counts.
pub const MAX_STEP_VISITS: u32 = 5;

/// Lifecycle state of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Created,
    Scheduling,
    Todo,
    InProgress,
    Review,
    Blocked,
    WaitingForInput,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Cancelled)
    }
}

/// A repository bound to a task, with the branch new sessions fork from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryBinding {
    pub repository_id: String,
    pub base_branch: String,
}

/// A unit of work. Owns zero or more [`TaskSession`]s; at most one is primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub workflow_id: WorkflowId,
    pub workflow_step_id: WorkflowStepId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub state: TaskState,
    #[serde(default)]
    pub repositories: Vec<RepositoryBinding>,
    /// Denormalized cache; the session is the owner of the relationship
    /// (`TaskSession::task_id`), this is a read convenience only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_session_id: Option<TaskSessionId>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Options accepted when creating a new [`Task`].
pub struct TaskConfig {
    pub title: String,
    pub description: String,
    pub workflow_id: WorkflowId,
    pub workflow_step_id: WorkflowStepId,
    pub repositories: Vec<RepositoryBinding>,
}

impl TaskConfig {
    pub fn new(title: impl Into<String>, workflow_id: WorkflowId, workflow_step_id: WorkflowStepId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            workflow_id,
            workflow_step_id,
            repositories: Vec::new(),
        }
    }

    crate::setters! {
        into { description: String }
        set { repositories: Vec<RepositoryBinding> }
    }
}

impl Task {
    pub fn new(config: TaskConfig, now_ms: u64) -> Self {
        Self {
            id: TaskId::new(),
            workflow_id: config.workflow_id,
            workflow_step_id: config.workflow_step_id,
            title: config.title,
            description: config.description,
            state: TaskState::Created,
            repositories: config.repositories,
            primary_session_id: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }
}

/// Lifecycle state of a [`TaskSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSessionStatus {
    Created,
    Starting,
    Running,
    WaitingForInput,
    Completed,
    Failed,
    Cancelled,
}

impl TaskSessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskSessionStatus::Completed | TaskSessionStatus::Failed | TaskSessionStatus::Cancelled
        )
    }
}

/// A git worktree bound to a session for isolated editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeBinding {
    pub path: String,
    pub branch: String,
}

/// One execution attempt of a [`Task`].
///
/// `metadata` is an opaque JSON map (holds `plan_mode`, `acp_session_id`,
/// etc.) mutated only through the store's whole-row update, never in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSession {
    pub id: TaskSessionId,
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_execution_id: Option<crate::AgentId>,
    pub agent_profile_id: String,
    pub executor_id: String,
    pub environment_id: String,
    pub repository_id: String,
    pub base_branch: String,
    #[serde(default)]
    pub worktrees: Vec<WorktreeBinding>,
    pub state: TaskSessionStatus,
    pub workflow_step_id: WorkflowStepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<String>,
    pub is_primary: bool,
    #[serde(default)]
    pub is_passthrough: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Immutable snapshots of profile/executor/environment/repository taken
    /// at launch time, so later edits to those entities don't retroactively
    /// change what this session believes it ran with.
    #[serde(default)]
    pub snapshot: serde_json::Map<String, serde_json::Value>,
    pub started_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TaskSession {
    /// Read the `plan_mode` metadata flag (`false` if absent).
    pub fn plan_mode(&self) -> bool {
        self.metadata.get("plan_mode").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn set_plan_mode(&mut self, enabled: bool) {
        self.metadata.insert("plan_mode".to_string(), serde_json::Value::Bool(enabled));
    }

    pub fn acp_session_id(&self) -> Option<&str> {
        self.metadata.get("acp_session_id").and_then(|v| v.as_str())
    }

    pub fn set_acp_session_id(&mut self, id: impl Into<String>) {
        self.metadata.insert("acp_session_id".to_string(), serde_json::Value::String(id.into()));
    }

    pub fn clear_acp_session_id(&mut self) {
        self.metadata.remove("acp_session_id");
    }

    pub fn is_ready_for_prompt(&self) -> bool {
        matches!(self.state, TaskSessionStatus::WaitingForInput | TaskSessionStatus::Created)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TaskSessionBuilder => TaskSession {
        into {
            agent_profile_id: String = "default",
            executor_id: String = "local",
            environment_id: String = "local",
            repository_id: String = "repo-1",
            base_branch: String = "main",
        }
        set {
            task_id: TaskId = TaskId::new(),
            workflow_step_id: WorkflowStepId = WorkflowStepId::new(),
            worktrees: Vec<WorktreeBinding> = Vec::new(),
            state: TaskSessionStatus = TaskSessionStatus::Created,
            is_primary: bool = true,
            is_passthrough: bool = false,
            metadata: serde_json::Map<String, serde_json::Value> = serde_json::Map::new(),
            snapshot: serde_json::Map<String, serde_json::Value> = serde_json::Map::new(),
            started_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        option {
            review_status: String = None,
            completed_at_ms: u64 = None,
            error_message: String = None,
        }
        computed {
            id: TaskSessionId = TaskSessionId::new(),
        }
    }
}

/// One prompt/response cycle inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub session_id: TaskSessionId,
    pub task_id: TaskId,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Turn {
    pub fn is_open(&self) -> bool {
        self.completed_at_ms.is_none()
    }
}

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorType {
    User,
    Agent,
}

/// Tag-only message kind, mirroring `SessionUpdate.type` 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    Content,
    ToolCall,
    Progress,
    Error,
    Status,
    PermissionRequest,
}

/// A single append-only entry in a turn's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: TaskSessionId,
    pub turn_id: TurnId,
    pub author_type: AuthorType,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub requests_input: bool,
    pub created_at_ms: u64,
}

// ---------------------------------------------------------------------
// Workflow / WorkflowStep
// ---------------------------------------------------------------------

/// The four moments a [`WorkflowStep`]'s actions can fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    OnEnter,
    OnExit,
    OnTurnStart,
    OnTurnComplete,
}

/// Recognized action types. Unknown action types round-trip via `Custom`
/// rather than failing to deserialize, since workflow definitions are
/// user-authored data, not code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AutoStartAgent,
    EnablePlanMode,
    ResetAgentContext,
    DisablePlanMode,
    MoveToNext,
    MoveToPrevious,
    MoveToStep,
    #[serde(other)]
    Custom,
}

impl ActionType {
    pub fn is_transition(&self) -> bool {
        matches!(self, ActionType::MoveToNext | ActionType::MoveToPrevious | ActionType::MoveToStep)
    }
}

/// One action attached to a trigger, with a free-form config map
/// (`config.step_id`, `config.requires_approval`, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl StepAction {
    pub fn new(action_type: ActionType) -> Self {
        Self { action_type, config: serde_json::Map::new() }
    }

    pub fn requires_approval(&self) -> bool {
        self.config.get("requires_approval").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn target_step_id(&self) -> Option<WorkflowStepId> {
        self.config.get("step_id").and_then(|v| v.as_str()).map(WorkflowStepId::from_string)
    }
}

/// The four trigger-keyed action lists on a [`WorkflowStep`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepEvents {
    #[serde(default)]
    pub on_enter: Vec<StepAction>,
    #[serde(default)]
    pub on_exit: Vec<StepAction>,
    #[serde(default)]
    pub on_turn_start: Vec<StepAction>,
    #[serde(default)]
    pub on_turn_complete: Vec<StepAction>,
}

impl StepEvents {
    pub fn for_trigger(&self, trigger: Trigger) -> &[StepAction] {
        match trigger {
            Trigger::OnEnter => &self.on_enter,
            Trigger::OnExit => &self.on_exit,
            Trigger::OnTurnStart => &self.on_turn_start,
            Trigger::OnTurnComplete => &self.on_turn_complete,
        }
    }
}

/// A single step in a user-defined [`Workflow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: WorkflowStepId,
    pub workflow_id: WorkflowId,
    pub position: i64,
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// Template substituted into auto-start prompts (`{task_description}`, ...).
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub events: StepEvents,
    #[serde(default = "default_true")]
    pub allow_manual_move: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_archive_after_hours: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// A user-defined state machine a [`Task`] moves through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    /// Step ordering used by `move_to_next`/`move_to_previous`: by
    /// `position`, ties broken by the lexicographically lower id.
    pub fn ordered_steps(&self) -> Vec<&WorkflowStep> {
        let mut steps: Vec<&WorkflowStep> = self.steps.iter().collect();
        steps.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        steps
    }

    pub fn step(&self, id: &WorkflowStepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn next_step(&self, current: &WorkflowStepId) -> Option<&WorkflowStep> {
        let ordered = self.ordered_steps();
        let current = self.step(current)?;
        ordered
            .into_iter()
            .filter(|s| (s.position, s.id.as_str()) > (current.position, current.id.as_str()))
            .min_by_key(|s| (s.position, s.id.as_str().to_string()))
    }

    pub fn previous_step(&self, current: &WorkflowStepId) -> Option<&WorkflowStep> {
        let ordered = self.ordered_steps();
        let current = self.step(current)?;
        ordered
            .into_iter()
            .filter(|s| (s.position, s.id.as_str()) < (current.position, current.id.as_str()))
            .max_by_key(|s| (s.position, s.id.as_str().to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            title: String = "untitled task",
            description: String = "",
        }
        set {
            workflow_id: WorkflowId = WorkflowId::new(),
            workflow_step_id: WorkflowStepId = WorkflowStepId::new(),
            state: TaskState = TaskState::Created,
            repositories: Vec<RepositoryBinding> = Vec::new(),
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        option {
            primary_session_id: TaskSessionId = None,
        }
        computed {
            id: TaskId = TaskId::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
