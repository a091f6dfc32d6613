// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_starts_in_created_state() {
    let wf_id = WorkflowId::new();
    let step_id = WorkflowStepId::new();
    let task = Task::new(TaskConfig::new("fix the bug", wf_id, step_id), 1000);
    assert_eq!(task.state, TaskState::Created);
    assert!(task.primary_session_id.is_none());
}

#[test]
fn task_config_setters_apply() {
    let config = TaskConfig::new("t", WorkflowId::new(), WorkflowStepId::new())
        .description("longer description")
        .repositories(vec![RepositoryBinding { repository_id: "repo-1".into(), base_branch: "main".into() }]);
    assert_eq!(config.description, "longer description");
    assert_eq!(config.repositories.len(), 1);
}

#[test]
fn session_plan_mode_round_trips_through_metadata() {
    let mut session = TaskSession::builder().build();
    assert!(!session.plan_mode());
    session.set_plan_mode(true);
    assert!(session.plan_mode());
}

#[test]
fn session_acp_session_id_clears() {
    let mut session = TaskSession::builder().build();
    session.set_acp_session_id("acp-123");
    assert_eq!(session.acp_session_id(), Some("acp-123"));
    session.clear_acp_session_id();
    assert_eq!(session.acp_session_id(), None);
}

#[test]
fn workflow_ordered_steps_breaks_ties_by_id() {
    let wf_id = WorkflowId::new();
    let mut a = WorkflowStep {
        id: WorkflowStepId::from_string("wfs-aaaaaaaaaaaaaaaaaaa"),
        workflow_id: wf_id.clone(),
        position: 0,
        name: "a".into(),
        color: String::new(),
        prompt: String::new(),
        events: StepEvents::default(),
        allow_manual_move: true,
        auto_archive_after_hours: None,
    };
    let mut b = a.clone();
    b.id = WorkflowStepId::from_string("wfs-bbbbbbbbbbbbbbbbbbb");
    a.position = 1;
    b.position = 1;

    let workflow = Workflow { id: wf_id, name: "w".into(), steps: vec![b.clone(), a.clone()] };
    let ordered = workflow.ordered_steps();
    assert_eq!(ordered[0].id, a.id);
    assert_eq!(ordered[1].id, b.id);
}

#[test]
fn next_step_returns_none_at_terminal_position() {
    let (workflow, by_name) = crate::test_support::five_step_workflow();
    let done = &by_name["Done"];
    assert!(workflow.next_step(done).is_none());
}
