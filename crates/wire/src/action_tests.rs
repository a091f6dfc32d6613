// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::str::FromStr;

#[test]
fn as_str_and_from_str_round_trip_every_variant() {
    let variants = [
        Action::OrchestratorStatus,
        Action::OrchestratorQueue,
        Action::OrchestratorStart,
        Action::OrchestratorStop,
        Action::OrchestratorPrompt,
        Action::OrchestratorComplete,
        Action::SessionLaunch,
        Action::TaskSessionResume,
        Action::TaskSessionPrepare,
        Action::TaskSessionStatus,
        Action::AgentCancel,
        Action::PermissionRequested,
        Action::PermissionRespond,
        Action::SessionMessageAdded,
        Action::SessionStateChanged,
        Action::SessionTurnStarted,
        Action::SessionTurnCompleted,
        Action::SessionWaitingForInput,
    ];
    for action in variants {
        assert_eq!(Action::from_str(action.as_str()).unwrap(), action);
    }
}

#[test]
fn unknown_action_string_is_rejected() {
    assert!(Action::from_str("not.a.real.action").is_err());
}

#[test]
fn launch_session_request_defaults_to_no_existing_session() {
    let request = LaunchSessionRequest {
        task_id: kandev_core::TaskId::new(),
        intent: LaunchIntent::Create,
        session_id: None,
        agent_profile_id: None,
    };
    let json = serde_json::to_value(&request).unwrap();
    assert!(json.get("session_id").is_none());
}
