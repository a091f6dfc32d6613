// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: the one component that actually drives agent
//! lifecycles, turns workflow decisions into committed state, and fans
//! outward notifications out through the [`crate::hub::Hub`].
//!
//! Holds one live `Box<dyn AgentAdapter>` per running session behind a
//! `tokio::sync::Mutex` so prompts/cancels against the same session
//! serialize without blocking unrelated sessions.

mod permissions;
mod turn;

pub use permissions::PendingPermission;

use crate::hub::Hub;
use crate::launcher::AgentLauncher;
use kandev_adapters::adapter::AgentAdapter;
use kandev_core::{
    BroadcastScope, Clock, CoreError, CoreResult, PermissionId, QueuedMessage, SessionQueue, SystemClock, Task, TaskId,
    TaskSession, TaskSessionId, TaskSessionStatus, Workflow, WorkflowStepId,
};
use kandev_store::Store;
use kandev_wire::{Envelope, SessionStateChangedNotification};
use kandev_workflow::engine::{self, TriggerRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

type AdapterHandle = Arc<tokio::sync::Mutex<Box<dyn AgentAdapter>>>;

/// The daemon's default concrete orchestrator: real wall-clock time.
pub type Orchestrator = OrchestratorService<SystemClock>;

pub struct OrchestratorService<C: Clock = SystemClock> {
    pub(crate) store: Store,
    pub(crate) hub: Hub,
    pub(crate) clock: C,
    pub(crate) launcher: Arc<dyn AgentLauncher>,
    pub(crate) runtimes: Mutex<HashMap<TaskSessionId, AdapterHandle>>,
    pub(crate) current_turns: Mutex<HashMap<TaskSessionId, kandev_core::TurnId>>,
    pub(crate) pending_permissions: Mutex<HashMap<PermissionId, PendingPermission>>,
    pub(crate) queues: Mutex<HashMap<TaskSessionId, SessionQueue>>,
    pub(crate) step_visits: Mutex<HashMap<TaskSessionId, u32>>,
}

impl<C: Clock + 'static> OrchestratorService<C> {
    pub fn new(store: Store, hub: Hub, clock: C, launcher: Arc<dyn AgentLauncher>) -> Arc<Self> {
        Arc::new(Self {
            store,
            hub,
            clock,
            launcher,
            runtimes: Mutex::new(HashMap::new()),
            current_turns: Mutex::new(HashMap::new()),
            pending_permissions: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            step_visits: Mutex::new(HashMap::new()),
        })
    }

    fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    async fn workflow_for_session(&self, session: &TaskSession) -> CoreResult<(Task, Workflow)> {
        let task = self.store.get_task(&session.task_id).await?;
        let workflow = self.store.get_workflow(&task.workflow_id).await?;
        Ok((task, workflow))
    }

    /// Creates (or loads, on resume) a session row and — unless the caller
    /// asked only to stage one with `LaunchIntent::Prepare` — starts its
    /// agent adapter.
    pub async fn launch_session(
        self: &Arc<Self>,
        task_id: TaskId,
        intent: kandev_wire::LaunchIntent,
        session_id: Option<TaskSessionId>,
        agent_profile_id: Option<String>,
    ) -> CoreResult<TaskSession> {
        use kandev_wire::LaunchIntent;

        let task = self.store.get_task(&task_id).await?;
        let now = self.now_ms();

        let mut session = match intent {
            LaunchIntent::Resume => {
                let id = session_id.ok_or_else(|| CoreError::Validation("session_id is required to resume".into()))?;
                self.store.get_session(&id).await?
            }
            LaunchIntent::Create | LaunchIntent::Prepare => {
                let repo = task
                    .repositories
                    .first()
                    .ok_or_else(|| CoreError::Validation("task has no repository bound".into()))?;
                let session = TaskSession {
                    id: TaskSessionId::new(),
                    task_id: task.id.clone(),
                    agent_execution_id: None,
                    agent_profile_id: agent_profile_id.unwrap_or_else(|| "default".to_string()),
                    executor_id: "local".to_string(),
                    environment_id: "local".to_string(),
                    repository_id: repo.repository_id.clone(),
                    base_branch: repo.base_branch.clone(),
                    worktrees: Vec::new(),
                    state: TaskSessionStatus::Created,
                    workflow_step_id: task.workflow_step_id.clone(),
                    review_status: None,
                    is_primary: task.primary_session_id.is_none(),
                    is_passthrough: false,
                    metadata: serde_json::Map::new(),
                    snapshot: serde_json::Map::new(),
                    started_at_ms: now,
                    updated_at_ms: now,
                    completed_at_ms: None,
                    error_message: None,
                };
                self.store.create_session(session.clone()).await?;
                session
            }
        };

        if matches!(intent, LaunchIntent::Prepare) {
            info!(session_id = %session.id, "session staged without starting an agent");
            return Ok(session);
        }

        self.start_adapter(&mut session).await?;
        Ok(session)
    }

    /// Spawns (or re-initializes) the agent adapter for `session` and wires
    /// its update stream and permission handler. Leaves the session at
    /// `WaitingForInput` on success.
    pub(crate) async fn start_adapter(self: &Arc<Self>, session: &mut TaskSession) -> CoreResult<()> {
        session.state = TaskSessionStatus::Starting;
        session.updated_at_ms = self.now_ms();
        self.store.update_session(session.clone()).await?;
        self.broadcast_state_changed(session).await;

        let mut adapter = self.launcher.launch(session).await.map_err(CoreError::from)?;
        let info = adapter.initialize().await.map_err(CoreError::from)?;
        info!(agent = %info.name, version = %info.version, session_id = %session.id, "agent adapter initialized");

        let acp_session_id = match session.acp_session_id() {
            Some(existing) => {
                adapter.load_session(existing).await.map_err(CoreError::from)?;
                existing.to_string()
            }
            None => adapter.new_session().await.map_err(CoreError::from)?,
        };
        session.set_acp_session_id(acp_session_id);

        let updates = adapter
            .take_updates()
            .ok_or_else(|| CoreError::Internal("adapter update channel already taken".into()))?;

        adapter.set_permission_handler(self.permission_handler(session.id.clone()));

        let handle: AdapterHandle = Arc::new(tokio::sync::Mutex::new(adapter));
        self.runtimes.lock().insert(session.id.clone(), handle);
        self.spawn_update_listener(session.id.clone(), updates);

        session.state = TaskSessionStatus::WaitingForInput;
        session.updated_at_ms = self.now_ms();
        self.store.update_session(session.clone()).await?;
        self.broadcast_state_changed(session).await;
        Ok(())
    }

    pub async fn cancel_agent(self: &Arc<Self>, session_id: TaskSessionId) -> CoreResult<()> {
        let handle = self.runtimes.lock().get(&session_id).cloned();
        let Some(handle) = handle else {
            return Err(CoreError::not_found("session runtime", session_id.to_string()));
        };
        handle.lock().await.cancel().await.map_err(CoreError::from)?;
        self.cancel_all_for_session(&session_id);
        Ok(())
    }

    /// Halts every session under `task_id`: cancels in-flight turns, answers
    /// any pending permission with `Cancel`, and marks sessions `Cancelled`
    /// unless they already reached a terminal state.
    pub async fn stop_task(self: &Arc<Self>, task_id: TaskId, reason: Option<String>, force: bool) -> CoreResult<()> {
        let sessions = self.store.list_for_task(&task_id).await?;
        for mut session in sessions {
            if session.state.is_terminal() {
                continue;
            }
            let handle = self.runtimes.lock().get(&session.id).cloned();
            if let Some(handle) = handle {
                let mut adapter = handle.lock().await;
                if force {
                    adapter.close().await;
                } else {
                    let _ = adapter.cancel().await;
                }
            }
            self.cancel_all_for_session(&session.id);
            self.runtimes.lock().remove(&session.id);

            session.state = TaskSessionStatus::Cancelled;
            session.error_message = reason.clone().or_else(|| Some("stopped".to_string()));
            session.completed_at_ms = Some(self.now_ms());
            session.updated_at_ms = self.now_ms();
            self.store.update_session(session.clone()).await?;
            self.broadcast_state_changed(&session).await;
        }

        let mut task = self.store.get_task(&task_id).await?;
        task.state = kandev_core::TaskState::Cancelled;
        task.updated_at_ms = self.now_ms();
        self.store.update_task(task).await?;
        Ok(())
    }

    /// Marks a task (and its sessions still open) `Completed` without an
    /// explicit cancel — the happy-path end of a task's workflow.
    pub async fn complete_task(self: &Arc<Self>, task_id: TaskId) -> CoreResult<()> {
        let sessions = self.store.list_for_task(&task_id).await?;
        for mut session in sessions {
            if session.state.is_terminal() {
                continue;
            }
            let handle = self.runtimes.lock().remove(&session.id);
            if let Some(handle) = handle {
                handle.lock().await.close().await;
            }
            self.cancel_all_for_session(&session.id);

            session.state = TaskSessionStatus::Completed;
            session.completed_at_ms = Some(self.now_ms());
            session.updated_at_ms = self.now_ms();
            self.store.update_session(session.clone()).await?;
            self.broadcast_state_changed(&session).await;
        }

        let mut task = self.store.get_task(&task_id).await?;
        task.state = kandev_core::TaskState::Completed;
        task.updated_at_ms = self.now_ms();
        self.store.update_task(task).await?;
        Ok(())
    }

    /// Applies a transition decided by the workflow engine: persists the new
    /// step, runs `exit_effects`/`on_enter_effects` (unless suppressed),
    /// and broadcasts `WorkflowStepChanged`.
    pub(crate) async fn commit_step_transition(
        self: &Arc<Self>,
        session: &mut TaskSession,
        workflow: &Workflow,
        from_step_id: WorkflowStepId,
        to_step_id: WorkflowStepId,
        apply_on_enter: bool,
    ) -> CoreResult<()> {
        for effect in engine::exit_effects(workflow, &from_step_id, &session.id) {
            self.apply_effect(session, effect).await?;
        }

        session.workflow_step_id = to_step_id.clone();
        session.updated_at_ms = self.now_ms();
        self.store.update_session(session.clone()).await?;

        let exceeded = {
            let mut visits = self.step_visits.lock();
            let count = visits.entry(session.id.clone()).or_insert(0);
            *count += 1;
            engine::step_visit_exceeded(*count)
        };

        self.broadcast(
            BroadcastScope::Task(session.task_id.clone()),
            kandev_core::Event::WorkflowStepChanged {
                task_id: session.task_id.clone(),
                session_id: session.id.clone(),
                from_step_id,
                to_step_id: to_step_id.clone(),
            },
        )
        .await;

        if apply_on_enter && exceeded {
            warn!(session_id = %session.id, step_id = %to_step_id, "step visit limit reached, suppressing on_enter effects");
        } else if apply_on_enter {
            for effect in engine::on_enter_effects(workflow, &to_step_id, session) {
                self.apply_effect(session, effect).await?;
            }
        }

        Ok(())
    }

    pub(crate) async fn apply_effect(self: &Arc<Self>, session: &mut TaskSession, effect: kandev_core::Effect) -> CoreResult<()> {
        use kandev_core::Effect;
        match effect {
            Effect::ResetAgentContext { .. } => {
                let handle = self.runtimes.lock().remove(&session.id);
                if let Some(handle) = handle {
                    handle.lock().await.close().await;
                }
                session.clear_acp_session_id();
                self.start_adapter(session).await?;
            }
            Effect::SendPrompt { prompt, .. } => {
                self.dispatch_prompt(session, prompt, kandev_core::AuthorType::Agent).await?;
            }
            Effect::EnqueuePrompt { session_id, task_id, prompt } => {
                let now = self.now_ms();
                let queued = QueuedMessage::new(session_id, task_id, prompt, kandev_core::AuthorType::Agent, now);
                self.queues.lock().entry(session.id.clone()).or_default().push(queued);
            }
            Effect::CancelAgent { .. } => {
                let handle = self.runtimes.lock().get(&session.id).cloned();
                if let Some(handle) = handle {
                    let _ = handle.lock().await.cancel().await;
                }
            }
            Effect::RespondToPermission { permission_id, option_id, .. } => {
                self.resolve_permission(permission_id, option_id, false).await?;
            }
            Effect::SetPlanMode { enabled, .. } => {
                session.set_plan_mode(enabled);
                self.store.update_session(session.clone()).await?;
            }
            Effect::MoveToStep { .. } | Effect::SpawnAgentController { .. } => {
                // MoveToStep transitions are committed by the caller that
                // already holds the workflow (`commit_step_transition`);
                // SpawnAgentController has no meaning in the in-process
                // adapter model, where `start_adapter` already does this.
            }
            Effect::Broadcast { scope, payload } => {
                self.hub.broadcast(scope, Envelope::notification("custom", payload, self.now_ms())).await;
            }
        }
        Ok(())
    }

    pub(crate) async fn broadcast(&self, scope: BroadcastScope, event: kandev_core::Event) {
        let payload = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        let action = match &event {
            kandev_core::Event::SessionStateChanged { .. } => "session.state_changed",
            kandev_core::Event::TurnStarted { .. } => "session.turn.started",
            kandev_core::Event::TurnCompleted { .. } => "session.turn.completed",
            kandev_core::Event::MessageAdded { .. } => "session.message.added",
            kandev_core::Event::WorkflowStepChanged { .. } => "workflow.step_changed",
            kandev_core::Event::PermissionRequested { .. } => "permission.requested",
            kandev_core::Event::PermissionResolved { .. } => "permission.resolved",
            kandev_core::Event::SessionLaunched { .. } => "session.launched",
            kandev_core::Event::Custom => "custom",
        };
        self.hub.broadcast(scope, Envelope::notification(action, payload, self.now_ms())).await;
    }

    pub(crate) async fn broadcast_state_changed(&self, session: &TaskSession) {
        let notification = SessionStateChangedNotification {
            session_id: session.id.clone(),
            state: session.state,
            error_message: session.error_message.clone(),
        };
        let payload = serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null);
        self.hub
            .broadcast(
                BroadcastScope::Session(session.id.clone()),
                Envelope::notification(kandev_wire::Action::SessionStateChanged.as_str(), payload, self.now_ms()),
            )
            .await;
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
