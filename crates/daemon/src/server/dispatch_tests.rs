// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::hub::Hub;
use crate::launcher::fake::FakeAgentLauncher;
use crate::orchestrator::OrchestratorService;
use kandev_core::SystemClock;
use kandev_store::Store;
use kandev_wire::FrameType;
use std::sync::Arc;

fn test_state() -> Arc<AppState> {
    let store = Store::open_in_memory().expect("in-memory store");
    let hub = Hub::spawn();
    let launcher = FakeAgentLauncher::new();
    let orchestrator = OrchestratorService::new(store, hub.clone(), SystemClock, Arc::new(launcher));
    Arc::new(AppState { orchestrator, hub })
}

#[tokio::test]
async fn malformed_json_returns_error_envelope_without_id() {
    let state = test_state();
    let reply = handle_frame(&state, "client-1", "not json").await.expect("error envelope");
    assert_eq!(reply.frame_type, FrameType::Error);
    assert!(reply.id.is_none());
}

#[tokio::test]
async fn notification_frame_from_client_gets_no_reply() {
    let state = test_state();
    let text = serde_json::to_string(&Envelope::notification("session.message.added", serde_json::json!({}), 0)).unwrap();
    let reply = handle_frame(&state, "client-1", &text).await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn request_missing_action_returns_error_echoing_id() {
    let state = test_state();
    let envelope = Envelope { id: Some("req-1".to_string()), frame_type: FrameType::Request, action: None, payload: serde_json::json!({}), timestamp: 0 };
    let text = serde_json::to_string(&envelope).unwrap();
    let reply = handle_frame(&state, "client-1", &text).await.expect("error envelope");
    assert_eq!(reply.frame_type, FrameType::Error);
    assert_eq!(reply.id.as_deref(), Some("req-1"));
}

#[tokio::test]
async fn request_with_unknown_action_returns_error_echoing_id() {
    let state = test_state();
    let envelope = Envelope::request("req-2", "not.a.real.action", serde_json::json!({}), 0);
    let text = serde_json::to_string(&envelope).unwrap();
    let reply = handle_frame(&state, "client-1", &text).await.expect("error envelope");
    assert_eq!(reply.frame_type, FrameType::Error);
    assert_eq!(reply.id.as_deref(), Some("req-2"));
}

#[tokio::test]
async fn orchestrator_status_roundtrips_with_no_tasks() {
    let state = test_state();
    let envelope = Envelope::request("req-3", "orchestrator.status", serde_json::json!({}), 0);
    let text = serde_json::to_string(&envelope).unwrap();
    let reply = handle_frame(&state, "client-1", &text).await.expect("response envelope");
    assert_eq!(reply.frame_type, FrameType::Response);
    assert_eq!(reply.id.as_deref(), Some("req-3"));
    assert_eq!(reply.payload.get("tasks").and_then(|v| v.as_array()).map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn agent_cancel_on_unknown_session_returns_error() {
    let state = test_state();
    let payload = serde_json::json!({ "session_id": "tsk-unknown" });
    let envelope = Envelope::request("req-4", "agent.cancel", payload, 0);
    let text = serde_json::to_string(&envelope).unwrap();
    let reply = handle_frame(&state, "client-1", &text).await.expect("error envelope");
    assert_eq!(reply.frame_type, FrameType::Error);
    assert_eq!(reply.id.as_deref(), Some("req-4"));
}
