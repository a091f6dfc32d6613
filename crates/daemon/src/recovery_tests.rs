// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::hub::Hub;
use crate::launcher::fake::FakeAgentLauncher;
use crate::orchestrator::OrchestratorService;
use kandev_core::{
    RepositoryBinding, StepEvents, SystemClock, Task, TaskConfig, TaskSession, TaskSessionId, Workflow, WorkflowId, WorkflowStep,
    WorkflowStepId,
};
use kandev_store::Store;
use std::sync::Arc;

// `recover()` is typed against the daemon's concrete `Orchestrator` alias
// (`OrchestratorService<SystemClock>`), so tests use the real clock too —
// nothing here asserts on specific timestamps, only on state transitions.
fn test_orchestrator() -> (Arc<Orchestrator>, FakeAgentLauncher) {
    let store = Store::open_in_memory().expect("in-memory store");
    let hub = Hub::spawn();
    let launcher = FakeAgentLauncher::new();
    let orchestrator = OrchestratorService::new(store, hub, SystemClock, Arc::new(launcher.clone()));
    (orchestrator, launcher)
}

async fn seed_task_and_session(
    orchestrator: &Arc<Orchestrator>,
    state: kandev_core::TaskSessionStatus,
    acp_session_id: Option<&str>,
) -> TaskSession {
    let step_id = WorkflowStepId::new();
    let workflow = Workflow {
        id: WorkflowId::new(),
        name: "default".to_string(),
        steps: vec![WorkflowStep {
            id: step_id.clone(),
            workflow_id: WorkflowId::new(),
            position: 0,
            name: "working".to_string(),
            color: String::new(),
            prompt: String::new(),
            events: StepEvents::default(),
            allow_manual_move: true,
            auto_archive_after_hours: None,
        }],
    };
    orchestrator.store.create_workflow(workflow.clone()).await.unwrap();

    let config = TaskConfig::new("do the thing", workflow.id, step_id.clone())
        .repositories(vec![RepositoryBinding { repository_id: "repo-1".to_string(), base_branch: "main".to_string() }]);
    let task = Task::new(config, orchestrator.clock.epoch_ms());
    orchestrator.store.create_task(task.clone()).await.unwrap();

    let now = orchestrator.clock.epoch_ms();
    let mut session = TaskSession {
        id: TaskSessionId::new(),
        task_id: task.id.clone(),
        agent_execution_id: None,
        agent_profile_id: "default".to_string(),
        executor_id: "local".to_string(),
        environment_id: "local".to_string(),
        repository_id: "repo-1".to_string(),
        base_branch: "main".to_string(),
        worktrees: Vec::new(),
        state,
        workflow_step_id: step_id,
        review_status: None,
        is_primary: true,
        is_passthrough: false,
        metadata: serde_json::Map::new(),
        snapshot: serde_json::Map::new(),
        started_at_ms: now,
        updated_at_ms: now,
        completed_at_ms: None,
        error_message: None,
    };
    if let Some(id) = acp_session_id {
        session.set_acp_session_id(id);
    }
    orchestrator.store.create_session(session.clone()).await.unwrap();
    session
}

#[tokio::test]
async fn recover_marks_session_without_acp_id_as_interrupted() {
    let (orchestrator, _launcher) = test_orchestrator();
    let session = seed_task_and_session(&orchestrator, kandev_core::TaskSessionStatus::Running, None).await;

    recover(&orchestrator).await.unwrap();

    let stored = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored.state, kandev_core::TaskSessionStatus::Cancelled);
    assert_eq!(stored.error_message.as_deref(), Some("interrupted"));
}

#[tokio::test]
async fn recover_reattaches_session_with_acp_session_id() {
    let (orchestrator, launcher) = test_orchestrator();
    let session = seed_task_and_session(&orchestrator, kandev_core::TaskSessionStatus::Starting, Some("acp-123")).await;

    recover(&orchestrator).await.unwrap();

    let stored = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored.state, kandev_core::TaskSessionStatus::WaitingForInput);
    assert!(launcher.last_adapter().is_some());
}

#[tokio::test]
async fn recover_leaves_terminal_sessions_untouched() {
    let (orchestrator, _launcher) = test_orchestrator();
    let session = seed_task_and_session(&orchestrator, kandev_core::TaskSessionStatus::Completed, None).await;

    recover(&orchestrator).await.unwrap();

    let stored = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored.state, kandev_core::TaskSessionStatus::Completed);
    assert_eq!(stored.error_message, None);
}
