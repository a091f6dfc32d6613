// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kandev_core::{TaskBuilder, TaskState, WorkflowId, WorkflowStepId};

fn task(title: &str) -> Task {
    TaskBuilder::default()
        .title(title)
        .workflow_id(WorkflowId::new())
        .workflow_step_id(WorkflowStepId::new())
        .created_at_ms(1)
        .updated_at_ms(1)
        .build()
}

#[tokio::test]
async fn create_and_get_round_trips() {
    let store = Store::open_in_memory().unwrap();
    let task = task("write the release notes");
    store.create_task(task.clone()).await.unwrap();

    let loaded = store.get_task(&task.id).await.unwrap();
    assert_eq!(loaded.title, task.title);
    assert_eq!(loaded.state, TaskState::Created);
}

#[tokio::test]
async fn get_missing_task_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.get_task(&TaskId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { what: "task", .. }));
}

#[tokio::test]
async fn update_task_replaces_repositories() {
    let store = Store::open_in_memory().unwrap();
    let mut task = task("ship it");
    task.repositories.push(RepositoryBinding { repository_id: "repo-a".into(), base_branch: "main".into() });
    store.create_task(task.clone()).await.unwrap();

    task.repositories = vec![RepositoryBinding { repository_id: "repo-b".into(), base_branch: "dev".into() }];
    task.state = TaskState::InProgress;
    task.updated_at_ms = 2;
    store.update_task(task.clone()).await.unwrap();

    let loaded = store.get_task(&task.id).await.unwrap();
    assert_eq!(loaded.repositories.len(), 1);
    assert_eq!(loaded.repositories[0].repository_id, "repo-b");
    assert_eq!(loaded.state, TaskState::InProgress);
}

#[tokio::test]
async fn delete_task_soft_deletes() {
    let store = Store::open_in_memory().unwrap();
    let task = task("cleanup");
    store.create_task(task.clone()).await.unwrap();
    store.delete_task(&task.id, 5).await.unwrap();

    let err = store.get_task(&task.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn list_tasks_excludes_deleted() {
    let store = Store::open_in_memory().unwrap();
    let keep = task("keep me");
    let drop_me = task("drop me");
    store.create_task(keep.clone()).await.unwrap();
    store.create_task(drop_me.clone()).await.unwrap();
    store.delete_task(&drop_me.id, 5).await.unwrap();

    let tasks = store.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, keep.id);
}
