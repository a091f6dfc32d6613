// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes one incoming request `Envelope` to the orchestrator call its
//! `action` names, and turns the result back into a response or error
//! envelope. Notification-only actions (`permission.requested`,
//! `session.*` events) are never dispatched here — they only ever
//! travel daemon-to-client, via the hub.

use super::AppState;
use kandev_core::{Clock, CoreError, CoreResult};
use kandev_wire::{
    Action, AgentCancelRequest, Envelope, ErrorPayload, FrameType, LaunchSessionRequest, LaunchSessionResponse,
    OrchestratorCompleteRequest, OrchestratorQueueRequest, OrchestratorQueueResponse, OrchestratorStatusResponse,
    OrchestratorStopRequest, PermissionRespondRequest, PromptTaskRequest, TaskSessionStatusRequest, TaskSessionStatusResponse,
};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::sync::Arc;

fn now_ms() -> u64 {
    kandev_core::SystemClock.epoch_ms()
}

fn error_payload(err: &CoreError) -> serde_json::Value {
    serde_json::to_value(ErrorPayload::from_core(err)).unwrap_or(serde_json::Value::Null)
}

fn parse<T: DeserializeOwned>(payload: serde_json::Value) -> CoreResult<T> {
    serde_json::from_value(payload).map_err(|e| CoreError::Validation(e.to_string()))
}

pub(super) async fn handle_frame(state: &Arc<AppState>, client_id: &str, text: &str) -> Option<Envelope> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(err) => return Some(Envelope::error(None, error_payload(&CoreError::Protocol(err.to_string())), now_ms())),
    };

    if envelope.frame_type != FrameType::Request {
        return None;
    }

    let Some(id) = envelope.id.clone() else {
        return Some(Envelope::error(None, error_payload(&CoreError::Protocol("request frame missing id".into())), now_ms()));
    };
    let Some(action_str) = envelope.action.as_deref() else {
        return Some(Envelope::error(Some(id), error_payload(&CoreError::Protocol("request frame missing action".into())), now_ms()));
    };
    let action = match Action::from_str(action_str) {
        Ok(action) => action,
        Err(err) => return Some(Envelope::error(Some(id), error_payload(&err.into()), now_ms())),
    };

    let now = now_ms();
    match route(state, client_id, action, envelope.payload).await {
        Ok(payload) => Some(Envelope::response(id, payload, now)),
        Err(err) => Some(Envelope::error(Some(id), error_payload(&err), now)),
    }
}

async fn route(state: &Arc<AppState>, client_id: &str, action: Action, payload: serde_json::Value) -> CoreResult<serde_json::Value> {
    let orchestrator = &state.orchestrator;

    match action {
        Action::OrchestratorStatus => {
            let tasks = orchestrator.store.list_tasks().await?;
            Ok(serde_json::to_value(OrchestratorStatusResponse { tasks }).unwrap_or(serde_json::Value::Null))
        }
        Action::OrchestratorQueue => {
            let req: OrchestratorQueueRequest = parse(payload)?;
            let queued = orchestrator.queues.lock().get(&req.session_id).map(|q| q.len()).unwrap_or(0);
            Ok(serde_json::to_value(OrchestratorQueueResponse { queued }).unwrap_or(serde_json::Value::Null))
        }
        Action::OrchestratorStart => {
            let req: LaunchSessionRequest = parse(payload)?;
            launch(state, client_id, req).await
        }
        Action::OrchestratorStop => {
            let req: OrchestratorStopRequest = parse(payload)?;
            orchestrator.stop_task(req.task_id, req.reason, req.force).await?;
            Ok(serde_json::json!({}))
        }
        Action::OrchestratorPrompt => {
            let req: PromptTaskRequest = parse(payload)?;
            state.hub.subscribe_session(client_id.to_string(), req.session_id.clone()).await;
            orchestrator.prompt_task(req).await?;
            Ok(serde_json::json!({}))
        }
        Action::OrchestratorComplete => {
            let req: OrchestratorCompleteRequest = parse(payload)?;
            orchestrator.complete_task(req.task_id).await?;
            Ok(serde_json::json!({}))
        }
        Action::SessionLaunch | Action::TaskSessionResume | Action::TaskSessionPrepare => {
            let req: LaunchSessionRequest = parse(payload)?;
            launch(state, client_id, req).await
        }
        Action::TaskSessionStatus => {
            let req: TaskSessionStatusRequest = parse(payload)?;
            state.hub.subscribe_session(client_id.to_string(), req.session_id.clone()).await;
            let session = orchestrator.store.get_session(&req.session_id).await?;
            Ok(serde_json::to_value(TaskSessionStatusResponse { session }).unwrap_or(serde_json::Value::Null))
        }
        Action::AgentCancel => {
            let req: AgentCancelRequest = parse(payload)?;
            orchestrator.cancel_agent(req.session_id).await?;
            Ok(serde_json::json!({}))
        }
        Action::PermissionRespond => {
            let req: PermissionRespondRequest = parse(payload)?;
            orchestrator.respond_to_permission(req.session_id, req.pending_id, req.option_id, req.cancelled).await?;
            Ok(serde_json::json!({}))
        }
        Action::PermissionRequested
        | Action::SessionMessageAdded
        | Action::SessionStateChanged
        | Action::SessionTurnStarted
        | Action::SessionTurnCompleted
        | Action::SessionWaitingForInput => {
            Err(CoreError::Protocol(format!("{} is a notification-only action", action)))
        }
    }
}

async fn launch(state: &Arc<AppState>, client_id: &str, req: LaunchSessionRequest) -> CoreResult<serde_json::Value> {
    let session = state
        .orchestrator
        .launch_session(req.task_id, req.intent, req.session_id, req.agent_profile_id)
        .await?;
    state.hub.subscribe_session(client_id.to_string(), session.id.clone()).await;
    let worktree = session.worktrees.first();
    Ok(serde_json::to_value(LaunchSessionResponse {
        session_id: session.id,
        agent_execution_id: session.agent_execution_id.map(|id| id.0),
        state: session.state,
        worktree_path: worktree.map(|w| w.path.clone()).unwrap_or_default(),
        worktree_branch: worktree.map(|w| w.branch.clone()).unwrap_or_default(),
    })
    .unwrap_or(serde_json::Value::Null))
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
