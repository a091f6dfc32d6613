// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::launcher::fake::FakeAgentLauncher;
use kandev_core::{FakeClock, RepositoryBinding, StepEvents, Task, TaskConfig, TaskState, Workflow, WorkflowId, WorkflowStep};
use kandev_wire::{LaunchIntent, PromptTaskRequest};
use std::sync::Arc;

fn test_orchestrator() -> (Arc<OrchestratorService<FakeClock>>, FakeAgentLauncher) {
    let store = Store::open_in_memory().expect("in-memory store");
    let hub = Hub::spawn();
    let launcher = FakeAgentLauncher::new();
    let orchestrator = OrchestratorService::new(store, hub, FakeClock::new(), Arc::new(launcher.clone()));
    (orchestrator, launcher)
}

async fn seed_task(orchestrator: &Arc<OrchestratorService<FakeClock>>, step_id: WorkflowStepId) -> TaskId {
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

    let config = TaskConfig::new("do the thing", workflow.id, step_id)
        .repositories(vec![RepositoryBinding { repository_id: "repo-1".to_string(), base_branch: "main".to_string() }]);
    let task = Task::new(config, orchestrator.now_ms());
    orchestrator.store.create_task(task.clone()).await.unwrap();
    task.id
}

#[tokio::test]
async fn launch_session_create_starts_adapter_and_waits_for_input() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;

    let session = orchestrator.launch_session(task_id, LaunchIntent::Create, None, None).await.unwrap();

    assert_eq!(session.state, TaskSessionStatus::WaitingForInput);
    assert!(session.acp_session_id().is_some());
    assert!(launcher.last_adapter().is_some());
}

#[tokio::test]
async fn launch_session_prepare_stages_without_starting_adapter() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;

    let session = orchestrator.launch_session(task_id, LaunchIntent::Prepare, None, None).await.unwrap();

    assert_eq!(session.state, TaskSessionStatus::Created);
    assert!(launcher.last_adapter().is_none());
}

#[tokio::test]
async fn prompt_task_queues_when_session_is_not_ready() {
    let (orchestrator, _launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;
    let mut session = orchestrator.launch_session(task_id.clone(), LaunchIntent::Create, None, None).await.unwrap();

    // Force the session into a non-ready state to exercise the queue path.
    session.state = TaskSessionStatus::Running;
    orchestrator.store.update_session(session.clone()).await.unwrap();

    let req = PromptTaskRequest { task_id, session_id: session.id.clone(), prompt: "keep going".to_string(), model: None, plan_mode: false };
    orchestrator.prompt_task(req).await.unwrap();

    assert_eq!(orchestrator.queues.lock().get(&session.id).map(|q| q.len()), Some(1));
}

#[tokio::test]
async fn turn_completes_and_drains_one_queued_message() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;
    let session = orchestrator.launch_session(task_id.clone(), LaunchIntent::Create, None, None).await.unwrap();

    let req = PromptTaskRequest { task_id, session_id: session.id.clone(), prompt: "first".to_string(), model: None, plan_mode: false };
    orchestrator.prompt_task(req).await.unwrap();

    let adapter = launcher.last_adapter().expect("adapter launched");
    assert_eq!(adapter.prompts(), vec!["first".to_string()]);

    // A second prompt while the turn is open queues instead of dispatching.
    let queued_req = PromptTaskRequest { task_id: task_id.clone(), session_id: session.id.clone(), prompt: "second".to_string(), model: None, plan_mode: false };
    orchestrator.prompt_task(queued_req).await.unwrap();
    assert_eq!(orchestrator.queues.lock().get(&session.id).map(|q| q.len()), Some(1));

    let turn_id = orchestrator.current_turns.lock().get(&session.id).cloned().expect("turn open");
    adapter.push_update(kandev_core::SessionUpdate::Complete { session_id: session.id.clone(), turn_id: Some(turn_id), success: true });

    // Let the spawned update listener process the pushed update.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // The queue drain immediately redispatches, so the queue is empty and
    // the adapter has seen the second prompt too.
    assert_eq!(orchestrator.queues.lock().get(&session.id).map(|q| q.len()).unwrap_or(0), 0);
    assert_eq!(adapter.prompts(), vec!["first".to_string(), "second".to_string()]);

    let stored = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored.state, TaskSessionStatus::Running);
}

#[tokio::test]
async fn turn_failure_marks_session_failed_with_message() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;
    let session = orchestrator.launch_session(task_id.clone(), LaunchIntent::Create, None, None).await.unwrap();

    let req = PromptTaskRequest { task_id, session_id: session.id.clone(), prompt: "do it".to_string(), model: None, plan_mode: false };
    orchestrator.prompt_task(req).await.unwrap();

    let adapter = launcher.last_adapter().unwrap();
    let turn_id = orchestrator.current_turns.lock().get(&session.id).cloned().unwrap();
    adapter.push_update(kandev_core::SessionUpdate::Error {
        session_id: session.id.clone(),
        turn_id: Some(turn_id),
        message: "boom".to_string(),
        transient: false,
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let stored = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored.state, TaskSessionStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("boom"));
}

#[tokio::test]
async fn transient_error_leaves_turn_open() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;
    let session = orchestrator.launch_session(task_id.clone(), LaunchIntent::Create, None, None).await.unwrap();

    let req = PromptTaskRequest { task_id, session_id: session.id.clone(), prompt: "do it".to_string(), model: None, plan_mode: false };
    orchestrator.prompt_task(req).await.unwrap();

    let adapter = launcher.last_adapter().unwrap();
    let turn_id_before = orchestrator.current_turns.lock().get(&session.id).cloned().unwrap();
    adapter.push_update(kandev_core::SessionUpdate::Error {
        session_id: session.id.clone(),
        turn_id: Some(turn_id_before.clone()),
        message: "rate limited, retrying".to_string(),
        transient: true,
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(orchestrator.current_turns.lock().get(&session.id).cloned(), Some(turn_id_before));
    let stored = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored.state, TaskSessionStatus::Running);
}

#[tokio::test]
async fn permission_request_respond_roundtrip() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;
    let session = orchestrator.launch_session(task_id, LaunchIntent::Create, None, None).await.unwrap();

    let adapter = launcher.last_adapter().unwrap();
    let handler = adapter.permission_handler().expect("handler installed");

    let request = kandev_adapters::adapter::PermissionRequest {
        tool_call_id: "call-1".to_string(),
        title: "run rm -rf".to_string(),
        action_type: "shell".to_string(),
        action_details: serde_json::Map::new(),
        options: vec![kandev_core::PermissionOption { option_id: "allow".to_string(), name: "Allow".to_string(), kind: "allow".to_string() }],
    };

    let orchestrator_for_respond = Arc::clone(&orchestrator);
    let session_id = session.id.clone();
    let respond_task = tokio::spawn(async move {
        // Give the request a beat to land in the pending map.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let pending_id = orchestrator_for_respond.pending_permissions.lock().keys().next().cloned().unwrap();
        orchestrator_for_respond.respond_to_permission(session_id, pending_id, Some("allow".to_string()), false).await.unwrap();
    });

    let response = handler(request).await;
    respond_task.await.unwrap();

    assert_eq!(response.option_id.as_deref(), Some("allow"));
    assert!(!response.cancelled);
    assert!(orchestrator.pending_permissions.lock().is_empty());
}

#[tokio::test]
async fn stop_task_cancels_pending_permissions_and_marks_terminal() {
    let (orchestrator, launcher) = test_orchestrator();
    let task_id = seed_task(&orchestrator, WorkflowStepId::new()).await;
    let session = orchestrator.launch_session(task_id.clone(), LaunchIntent::Create, None, None).await.unwrap();

    let adapter = launcher.last_adapter().unwrap();
    let handler = adapter.permission_handler().unwrap();
    let request = kandev_adapters::adapter::PermissionRequest {
        tool_call_id: "call-1".to_string(),
        title: "run rm -rf".to_string(),
        action_type: "shell".to_string(),
        action_details: serde_json::Map::new(),
        options: vec![],
    };
    let pending = tokio::spawn(async move { handler(request).await });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    orchestrator.stop_task(task_id.clone(), Some("user stopped it".to_string()), false).await.unwrap();

    let response = pending.await.unwrap();
    assert!(response.cancelled);

    let stored_session = orchestrator.store.get_session(&session.id).await.unwrap();
    assert_eq!(stored_session.state, TaskSessionStatus::Cancelled);
    let stored_task = orchestrator.store.get_task(&task_id).await.unwrap();
    assert_eq!(stored_task.state, TaskState::Cancelled);
}
