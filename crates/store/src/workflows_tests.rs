// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kandev_core::test_support::five_step_workflow;

#[tokio::test]
async fn create_and_get_round_trips_steps_and_events() {
    let store = Store::open_in_memory().unwrap();
    let (workflow, by_name) = five_step_workflow();
    store.create_workflow(workflow.clone()).await.unwrap();

    let loaded = store.get_workflow(&workflow.id).await.unwrap();
    assert_eq!(loaded.steps.len(), 5);
    let done = loaded.step(by_name.get("Done").unwrap()).unwrap();
    assert_eq!(done.events.on_turn_start.len(), 1);
}

#[tokio::test]
async fn update_workflow_replaces_steps() {
    let store = Store::open_in_memory().unwrap();
    let (mut workflow, _) = five_step_workflow();
    store.create_workflow(workflow.clone()).await.unwrap();

    workflow.steps.truncate(2);
    store.update_workflow(workflow.clone()).await.unwrap();

    let loaded = store.get_workflow(&workflow.id).await.unwrap();
    assert_eq!(loaded.steps.len(), 2);
}

#[tokio::test]
async fn get_missing_workflow_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.get_workflow(&WorkflowId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { what: "workflow", .. }));
}

#[tokio::test]
async fn list_workflows_returns_every_created_workflow() {
    let store = Store::open_in_memory().unwrap();
    let (a, _) = five_step_workflow();
    let (b, _) = five_step_workflow();
    store.create_workflow(a.clone()).await.unwrap();
    store.create_workflow(b.clone()).await.unwrap();

    let workflows = store.list_workflows().await.unwrap();
    assert_eq!(workflows.len(), 2);
}
