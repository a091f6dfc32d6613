// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spawn_cat() -> Child {
    tokio::process::Command::new("cat")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("spawn cat")
}

#[tokio::test]
async fn prompt_before_new_session_fails_with_not_initialized() {
    let child = spawn_cat();
    let mut adapter = CodexAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    let err = adapter.prompt("hello").await.unwrap_err();
    assert!(matches!(err, AdapterError::NotInitialized));
    adapter.close().await;
}

#[tokio::test]
async fn cancel_before_new_session_fails_with_not_initialized() {
    let child = spawn_cat();
    let mut adapter = CodexAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    let err = adapter.cancel().await.unwrap_err();
    assert!(matches!(err, AdapterError::NotInitialized));
    adapter.close().await;
}

#[tokio::test]
async fn take_updates_returns_the_receiver_exactly_once() {
    let child = spawn_cat();
    let mut adapter = CodexAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    assert!(adapter.take_updates().is_some());
    assert!(adapter.take_updates().is_none());
    adapter.close().await;
}

#[test]
fn item_started_command_execution_becomes_tool_call() {
    let params = serde_json::json!({
        "threadId": "thread-abc",
        "turnId": "turn-1",
        "item": {"id": "call-1", "type": "commandExecution", "command": "ls -la"},
    });
    let update = item_event_to_session_update("item/started", &params).unwrap();
    match update {
        SessionUpdate::ToolCall { tool_call_id, title, .. } => {
            assert_eq!(tool_call_id, "call-1");
            assert_eq!(title, "ls -la");
        }
        other => panic!("expected ToolCall, got {other:?}"),
    }
}

#[test]
fn item_completed_becomes_tool_update() {
    let params = serde_json::json!({
        "threadId": "thread-abc",
        "item": {"id": "call-1", "type": "fileChange"},
    });
    let update = item_event_to_session_update("item/completed", &params).unwrap();
    assert!(matches!(update, SessionUpdate::ToolUpdate { .. }));
}

#[test]
fn turn_completed_failure_becomes_error_update() {
    let params = serde_json::json!({"threadId": "thread-abc", "error": "boom"});
    let update = terminal_update(&params, false).unwrap();
    match update {
        SessionUpdate::Error { message, transient, .. } => {
            assert_eq!(message, "boom");
            assert!(!transient);
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[test]
fn turn_completed_success_becomes_complete_update() {
    let params = serde_json::json!({"threadId": "thread-abc"});
    let update = terminal_update(&params, true).unwrap();
    assert!(matches!(update, SessionUpdate::Complete { success: true, .. }));
}

#[test]
fn is_approval_method_matches_both_item_kinds() {
    assert!(is_approval_method("item/commandExecution/requestApproval"));
    assert!(is_approval_method("item/fileChange/requestApproval"));
    assert!(!is_approval_method("item/started"));
}
