// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Brokers human-in-the-loop permission requests between an agent adapter's
//! injected callback and the outward `permission.respond` action. A pending
//! request's continuation is a `oneshot::Sender` so the adapter's await
//! point resumes the instant a decision lands, with no polling.

use super::OrchestratorService;
use kandev_adapters::adapter::{PermissionHandler, PermissionRequest, PermissionResponse};
use kandev_core::{
    AuthorType, BroadcastScope, Clock, CoreError, CoreResult, Event, Message, MessageId, MessageKind, Permission, PermissionId,
    PermissionSource, TaskSessionId,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

pub struct PendingPermission {
    pub permission: Permission,
    responder: oneshot::Sender<PermissionSource>,
}

impl<C: Clock + 'static> OrchestratorService<C> {
    /// Builds the closure handed to an adapter via `set_permission_handler`.
    /// Captures only an `Arc` clone of the orchestrator and the session id;
    /// the adapter's reader loop awaits the returned future without blocking
    /// on anything else.
    pub(crate) fn permission_handler(self: &Arc<Self>, session_id: TaskSessionId) -> PermissionHandler {
        let orchestrator = Arc::clone(self);
        Arc::new(move |request: PermissionRequest| {
            let orchestrator = Arc::clone(&orchestrator);
            let session_id = session_id.clone();
            Box::pin(async move { orchestrator.request_permission(session_id, request).await })
        })
    }

    async fn request_permission(self: &Arc<Self>, session_id: TaskSessionId, request: PermissionRequest) -> PermissionResponse {
        let now = self.now_ms();
        let mut permission = Permission::new(
            session_id.clone(),
            request.tool_call_id,
            request.title,
            request.action_type,
            request.options,
            now,
        );
        permission.action_details = request.action_details;

        let turn_id = self.current_turns.lock().get(&session_id).cloned();
        if let Some(turn_id) = turn_id {
            let mut metadata = serde_json::Map::new();
            metadata.insert("permission_id".to_string(), serde_json::Value::String(permission.id.to_string()));
            metadata.insert("tool_call_id".to_string(), serde_json::Value::String(permission.tool_call_id.clone()));
            metadata.insert("options".to_string(), serde_json::to_value(&permission.options).unwrap_or(serde_json::Value::Null));
            let message = Message {
                id: MessageId::new(),
                session_id: session_id.clone(),
                turn_id,
                author_type: AuthorType::Agent,
                kind: MessageKind::PermissionRequest,
                content: permission.title.clone(),
                metadata,
                requests_input: true,
                created_at_ms: now,
            };
            if let Err(err) = self.store.append_message(message.clone()).await {
                warn!(session_id = %session_id, error = %err, "failed to persist permission-request message");
            } else {
                let notification = kandev_wire::SessionMessageAddedNotification { session_id: session_id.clone(), message };
                let payload = serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null);
                self.hub
                    .broadcast(
                        BroadcastScope::Session(session_id.clone()),
                        kandev_wire::Envelope::notification(kandev_wire::Action::SessionMessageAdded.as_str(), payload, now),
                    )
                    .await;
            }
        }

        let (tx, rx) = oneshot::channel();
        let permission_id = permission.id.clone();
        self.pending_permissions.lock().insert(
            permission_id.clone(),
            PendingPermission { permission: permission.clone(), responder: tx },
        );

        let notification = kandev_wire::PermissionRequestedNotification {
            session_id: session_id.clone(),
            pending_id: permission_id.clone(),
            tool_call_id: permission.tool_call_id.clone(),
            title: permission.title.clone(),
            action_type: permission.action_type.clone(),
            options: permission.options.clone(),
        };
        let payload = serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null);
        self.hub
            .broadcast(
                BroadcastScope::Session(session_id.clone()),
                kandev_wire::Envelope::notification(kandev_wire::Action::PermissionRequested.as_str(), payload, now),
            )
            .await;
        let scope = BroadcastScope::Session(session_id.clone());
        self.broadcast(scope, Event::PermissionRequested { session_id, permission_id }).await;

        match rx.await {
            Ok(PermissionSource::Approve { option_id }) => PermissionResponse { option_id: Some(option_id), cancelled: false },
            Ok(PermissionSource::Cancel) => PermissionResponse { option_id: None, cancelled: true },
            Err(_) => {
                warn!("permission continuation dropped without a decision");
                PermissionResponse { option_id: None, cancelled: true }
            }
        }
    }

    /// Answers a pending permission from the `permission.respond` action.
    pub async fn respond_to_permission(
        self: &Arc<Self>,
        session_id: TaskSessionId,
        pending_id: PermissionId,
        option_id: Option<String>,
        cancelled: bool,
    ) -> CoreResult<()> {
        let pending = self.pending_permissions.lock().remove(&pending_id);
        let Some(pending) = pending else {
            return Err(CoreError::not_found("pending permission", pending_id.to_string()));
        };
        if pending.permission.session_id != session_id {
            return Err(CoreError::Validation("permission does not belong to that session".into()));
        }

        let source = if cancelled {
            PermissionSource::Cancel
        } else {
            let option_id = option_id.ok_or_else(|| CoreError::Validation("option_id is required unless cancelled".into()))?;
            if pending.permission.option(&option_id).is_none() {
                return Err(CoreError::Validation(format!("unknown option_id: {option_id}")));
            }
            PermissionSource::Approve { option_id }
        };

        let _ = pending.responder.send(source);
        self.broadcast(BroadcastScope::Session(session_id.clone()), Event::PermissionResolved { session_id, permission_id: pending_id }).await;
        Ok(())
    }

    pub(crate) async fn resolve_permission(self: &Arc<Self>, permission_id: PermissionId, option_id: Option<String>, cancelled: bool) -> CoreResult<()> {
        let session_id = self
            .pending_permissions
            .lock()
            .get(&permission_id)
            .map(|p| p.permission.session_id.clone())
            .ok_or_else(|| CoreError::not_found("pending permission", permission_id.to_string()))?;
        self.respond_to_permission(session_id, permission_id, option_id, cancelled).await
    }

    /// Cancels every permission still pending for `session_id`, used when a
    /// session ends with requests outstanding.
    pub(crate) fn cancel_all_for_session(self: &Arc<Self>, session_id: &TaskSessionId) {
        let mut pending_permissions = self.pending_permissions.lock();
        let ids: Vec<PermissionId> = pending_permissions
            .iter()
            .filter(|(_, p)| &p.permission.session_id == session_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            if let Some(pending) = pending_permissions.remove(&id) {
                let _ = pending.responder.send(PermissionSource::Cancel);
            }
        }
    }
}
