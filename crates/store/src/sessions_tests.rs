// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kandev_core::{AgentId, TaskSessionBuilder};

fn session(task_id: TaskId) -> TaskSession {
    TaskSessionBuilder::default().task_id(task_id).started_at_ms(1).updated_at_ms(1).build()
}

#[tokio::test]
async fn create_and_get_round_trips() {
    let store = Store::open_in_memory().unwrap();
    let session = session(TaskId::new());
    store.create_session(session.clone()).await.unwrap();

    let loaded = store.get_session(&session.id).await.unwrap();
    assert_eq!(loaded.task_id, session.task_id);
    assert_eq!(loaded.state, TaskSessionStatus::Created);
    assert!(loaded.metadata.is_empty());
}

#[tokio::test]
async fn update_session_round_trips_metadata_and_worktrees() {
    let store = Store::open_in_memory().unwrap();
    let mut session = session(TaskId::new());
    store.create_session(session.clone()).await.unwrap();

    session.set_plan_mode(true);
    session.worktrees.push(WorktreeBinding { path: "/tmp/w".into(), branch: "feature".into() });
    session.updated_at_ms = 2;
    store.update_session(session.clone()).await.unwrap();

    let loaded = store.get_session(&session.id).await.unwrap();
    assert!(loaded.plan_mode());
    assert_eq!(loaded.worktrees.len(), 1);
}

#[tokio::test]
async fn update_session_state_sets_completed_at_once() {
    let store = Store::open_in_memory().unwrap();
    let session = session(TaskId::new());
    store.create_session(session.clone()).await.unwrap();

    store.update_session_state(&session.id, TaskSessionStatus::Running, None, 5).await.unwrap();
    let mid = store.get_session(&session.id).await.unwrap();
    assert!(mid.completed_at_ms.is_none());

    store.update_session_state(&session.id, TaskSessionStatus::Completed, None, 10).await.unwrap();
    let done = store.get_session(&session.id).await.unwrap();
    assert_eq!(done.completed_at_ms, Some(10));

    // A later terminal transition must not clobber the first completion timestamp.
    store.update_session_state(&session.id, TaskSessionStatus::Failed, Some("oops".into()), 20).await.unwrap();
    let refailed = store.get_session(&session.id).await.unwrap();
    assert_eq!(refailed.completed_at_ms, Some(10));
    assert_eq!(refailed.error_message.as_deref(), Some("oops"));
}

#[tokio::test]
async fn update_session_state_missing_session_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.update_session_state(&TaskSessionId::new(), TaskSessionStatus::Running, None, 1).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { what: "session", .. }));
}

#[tokio::test]
async fn update_session_workflow_step_moves_the_session() {
    let store = Store::open_in_memory().unwrap();
    let session = session(TaskId::new());
    store.create_session(session.clone()).await.unwrap();

    let next = WorkflowStepId::new();
    store.update_session_workflow_step(&session.id, &next, 2).await.unwrap();
    let loaded = store.get_session(&session.id).await.unwrap();
    assert_eq!(loaded.workflow_step_id, next);
}

#[tokio::test]
async fn get_by_session_execution_id_finds_the_owning_session() {
    let store = Store::open_in_memory().unwrap();
    let mut session = session(TaskId::new());
    session.agent_execution_id = Some(AgentId::new("agt-123"));
    store.create_session(session.clone()).await.unwrap();

    let found = store.get_by_session_execution_id(&AgentId::new("agt-123")).await.unwrap();
    assert_eq!(found.unwrap().id, session.id);

    let missing = store.get_by_session_execution_id(&AgentId::new("agt-nope")).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn list_for_task_returns_every_session_for_that_task() {
    let store = Store::open_in_memory().unwrap();
    let task_id = TaskId::new();
    let a = session(task_id);
    let b = session(task_id);
    store.create_session(a.clone()).await.unwrap();
    store.create_session(b.clone()).await.unwrap();
    store.create_session(session(TaskId::new())).await.unwrap();

    let sessions = store.list_for_task(&task_id).await.unwrap();
    assert_eq!(sessions.len(), 2);
}
