// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::action::{Action, PromptTaskRequest};

#[test]
fn request_round_trips_through_json() {
    let payload = serde_json::to_value(PromptTaskRequest {
        task_id: kandev_core::TaskId::new(),
        session_id: kandev_core::TaskSessionId::new(),
        prompt: "hello".into(),
        model: None,
        plan_mode: false,
        attachments: Vec::new(),
    })
    .unwrap();
    let envelope = Envelope::request("req-1", Action::OrchestratorPrompt.as_str(), payload, 1000);

    let json = serde_json::to_string(&envelope).unwrap();
    let back: Envelope = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id.as_deref(), Some("req-1"));
    assert_eq!(back.frame_type, FrameType::Request);
    assert_eq!(back.action.as_deref(), Some("orchestrator.prompt"));
}

#[test]
fn notification_has_no_id() {
    let envelope = Envelope::notification(Action::SessionWaitingForInput.as_str(), serde_json::json!({}), 1);
    let json = serde_json::to_value(&envelope).unwrap();
    assert!(json.get("id").is_none());
}

#[test]
fn response_echoes_the_request_id() {
    let envelope = Envelope::response("req-7", serde_json::json!({"ok": true}), 2);
    assert_eq!(envelope.id.as_deref(), Some("req-7"));
    assert_eq!(envelope.frame_type, FrameType::Response);
}

#[test]
fn error_frame_carries_no_action() {
    let envelope = Envelope::error(Some("req-9".into()), serde_json::json!({"code": "NOT_FOUND"}), 3);
    assert!(envelope.action.is_none());
    assert_eq!(envelope.frame_type, FrameType::Error);
}
