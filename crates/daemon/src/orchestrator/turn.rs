// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn lifecycle: sending a prompt, listening to the adapter's update
//! stream, and closing a turn out — including the `on_turn_complete`
//! workflow trigger and the one-message FIFO queue drain.

use super::OrchestratorService;
use kandev_core::{
    AuthorType, BroadcastScope, Clock, CoreError, CoreResult, Event, Message, MessageId, MessageKind, SessionUpdate,
    TaskSession, TaskSessionId, TaskSessionStatus, Trigger, TurnId,
};
use kandev_wire::Envelope;
use kandev_workflow::engine::{self, TriggerRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

impl<C: Clock + 'static> OrchestratorService<C> {
    pub async fn prompt_task(self: &Arc<Self>, req: kandev_wire::PromptTaskRequest) -> CoreResult<()> {
        let mut session = self.store.get_session(&req.session_id).await?;
        if session.task_id != req.task_id {
            return Err(CoreError::Validation("session does not belong to that task".into()));
        }

        if !session.is_ready_for_prompt() {
            let now = self.now_ms();
            let queued = kandev_core::QueuedMessage::new(session.id.clone(), session.task_id.clone(), req.prompt, AuthorType::User, now);
            self.queues.lock().entry(session.id.clone()).or_default().push(queued);
            return Ok(());
        }

        if session.state == TaskSessionStatus::Created {
            self.start_adapter(&mut session).await?;
        }

        if req.plan_mode != session.plan_mode() {
            session.set_plan_mode(req.plan_mode);
        }

        let (_, workflow) = self.workflow_for_session(&session).await?;
        let outcome = engine::handle_trigger(TriggerRequest {
            task_id: session.task_id.clone(),
            session_id: session.id.clone(),
            trigger: Trigger::OnTurnStart,
            workflow: &workflow,
            current_step_id: session.workflow_step_id.clone(),
            evaluate_only: false,
        });

        if outcome.transitioned {
            if let (Some(from), Some(to)) = (outcome.from_step_id, outcome.to_step_id) {
                // An on_turn_start transition commits without the target
                // step's on_enter effects — this prompt is already this
                // turn's entry, so auto-starting a second one would fire twice.
                self.commit_step_transition(&mut session, &workflow, from, to, false).await?;
            }
        }

        self.dispatch_prompt(&mut session, req.prompt, AuthorType::User).await
    }

    pub(crate) async fn dispatch_prompt(self: &Arc<Self>, session: &mut TaskSession, prompt: String, author: AuthorType) -> CoreResult<()> {
        let handle = self
            .runtimes
            .lock()
            .get(&session.id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("session runtime", session.id.to_string()))?;

        let now = self.now_ms();
        let turn = self.store.open_turn(&session.id, &session.task_id, now).await?;
        self.current_turns.lock().insert(session.id.clone(), turn.id.clone());

        let message = Message {
            id: MessageId::new(),
            session_id: session.id.clone(),
            turn_id: turn.id.clone(),
            author_type: author,
            kind: MessageKind::Message,
            content: prompt.clone(),
            metadata: serde_json::Map::new(),
            requests_input: false,
            created_at_ms: now,
        };
        self.store.append_message(message.clone()).await?;
        self.broadcast(
            BroadcastScope::Session(session.id.clone()),
            Event::MessageAdded { session_id: session.id.clone(), message_id: message.id },
        )
        .await;
        self.broadcast(
            BroadcastScope::Session(session.id.clone()),
            Event::TurnStarted { session_id: session.id.clone(), turn_id: turn.id.clone() },
        )
        .await;

        handle.lock().await.prompt(&prompt).await.map_err(CoreError::from)?;

        session.state = TaskSessionStatus::Running;
        session.updated_at_ms = now;
        self.store.update_session(session.clone()).await?;
        self.broadcast_state_changed(session).await;
        Ok(())
    }

    pub(crate) fn spawn_update_listener(self: &Arc<Self>, session_id: TaskSessionId, mut updates: mpsc::Receiver<SessionUpdate>) {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                orchestrator.handle_update(update).await;
            }
            info!(session_id = %session_id, "agent update channel closed");
        });
    }

    async fn handle_update(self: &Arc<Self>, update: SessionUpdate) {
        let session_id = update.session_id().clone();
        let result = match update {
            SessionUpdate::Complete { session_id, turn_id, success } => self.handle_turn_complete(session_id, turn_id, success, None).await,
            SessionUpdate::Error { session_id, turn_id, message, transient } => {
                self.handle_turn_error(session_id, turn_id, message, transient).await
            }
            other => self.append_update_message(other).await,
        };
        if let Err(err) = result {
            warn!(session_id = %session_id, error = %err, "failed to process session update");
        }
    }

    async fn append_update_message(self: &Arc<Self>, update: SessionUpdate) -> CoreResult<()> {
        let session_id = update.session_id().clone();
        let turn_id = self.current_turns.lock().get(&session_id).cloned();
        let Some(turn_id) = turn_id else {
            warn!(session_id = %session_id, "update arrived with no open turn, dropping");
            return Ok(());
        };

        let now = self.now_ms();
        let (kind, content, metadata) = match update {
            SessionUpdate::MessageChunk { delta, .. } => (MessageKind::Content, delta, serde_json::Map::new()),
            SessionUpdate::ToolCall { tool_call_id, title, payload, .. } => {
                let mut metadata = serde_json::Map::new();
                metadata.insert("tool_call_id".to_string(), serde_json::Value::String(tool_call_id));
                metadata.insert("payload".to_string(), payload);
                (MessageKind::ToolCall, title, metadata)
            }
            SessionUpdate::ToolUpdate { tool_call_id, payload, .. } => {
                let mut metadata = serde_json::Map::new();
                metadata.insert("tool_call_id".to_string(), serde_json::Value::String(tool_call_id.clone()));
                metadata.insert("payload".to_string(), payload);
                (MessageKind::Progress, tool_call_id, metadata)
            }
            SessionUpdate::Plan { content, .. } => (MessageKind::Status, content.flatten(), serde_json::Map::new()),
            SessionUpdate::Reasoning { content, .. } => (MessageKind::Message, content.flatten(), serde_json::Map::new()),
            SessionUpdate::Complete { .. } | SessionUpdate::Error { .. } => {
                warn!(session_id = %session_id, "Complete/Error update reached append_update_message, expected it routed earlier");
                return Ok(());
            }
        };

        let message = Message {
            id: MessageId::new(),
            session_id: session_id.clone(),
            turn_id,
            author_type: AuthorType::Agent,
            kind,
            content,
            metadata,
            requests_input: false,
            created_at_ms: now,
        };
        self.store.append_message(message.clone()).await?;

        let notification = kandev_wire::SessionMessageAddedNotification { session_id: session_id.clone(), message: message.clone() };
        let payload = serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null);
        self.hub
            .broadcast(
                BroadcastScope::Session(session_id.clone()),
                Envelope::notification(kandev_wire::Action::SessionMessageAdded.as_str(), payload, now),
            )
            .await;
        self.broadcast(BroadcastScope::Session(session_id.clone()), Event::MessageAdded { session_id, message_id: message.id }).await;
        Ok(())
    }

    async fn handle_turn_error(self: &Arc<Self>, session_id: TaskSessionId, turn_id: Option<TurnId>, message: String, transient: bool) -> CoreResult<()> {
        let now = self.now_ms();
        let turn_for_message = turn_id.clone().or_else(|| self.current_turns.lock().get(&session_id).cloned());
        if let Some(turn_id) = turn_for_message {
            let error_message = Message {
                id: MessageId::new(),
                session_id: session_id.clone(),
                turn_id,
                author_type: AuthorType::Agent,
                kind: MessageKind::Error,
                content: message.clone(),
                metadata: serde_json::Map::new(),
                requests_input: false,
                created_at_ms: now,
            };
            self.store.append_message(error_message.clone()).await?;
            self.broadcast(
                BroadcastScope::Session(session_id.clone()),
                Event::MessageAdded { session_id: session_id.clone(), message_id: error_message.id },
            )
            .await;
        }

        if transient {
            warn!(session_id = %session_id, error = %message, "transient agent error, turn continues");
            return Ok(());
        }

        self.handle_turn_complete(session_id, turn_id, false, Some(message)).await
    }

    async fn handle_turn_complete(
        self: &Arc<Self>,
        session_id: TaskSessionId,
        turn_id: Option<TurnId>,
        success: bool,
        error_message: Option<String>,
    ) -> CoreResult<()> {
        let mut session = self.store.get_session(&session_id).await?;
        let now = self.now_ms();

        let turn_id = turn_id.or_else(|| self.current_turns.lock().get(&session_id).cloned());
        if let Some(turn_id) = turn_id.clone() {
            self.store.close_turn(&turn_id, serde_json::Map::new(), now).await?;
            self.current_turns.lock().remove(&session_id);
            self.broadcast(
                BroadcastScope::Session(session_id.clone()),
                Event::TurnCompleted { session_id: session_id.clone(), turn_id },
            )
            .await;
            let notification = kandev_wire::SessionTurnCompletedNotification { session_id: session_id.clone(), turn_id, success };
            let payload = serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null);
            self.hub
                .broadcast(
                    BroadcastScope::Session(session_id.clone()),
                    Envelope::notification(kandev_wire::Action::SessionTurnCompleted.as_str(), payload, now),
                )
                .await;
        }

        let (_, workflow) = self.workflow_for_session(&session).await?;
        let outcome = engine::handle_trigger(TriggerRequest {
            task_id: session.task_id.clone(),
            session_id: session.id.clone(),
            trigger: Trigger::OnTurnComplete,
            workflow: &workflow,
            current_step_id: session.workflow_step_id.clone(),
            evaluate_only: false,
        });

        for effect in outcome.side_effects {
            self.apply_effect(&mut session, effect).await?;
        }

        if outcome.transitioned {
            if let (Some(from), Some(to)) = (outcome.from_step_id, outcome.to_step_id) {
                self.commit_step_transition(&mut session, &workflow, from, to, true).await?;
            }
        }

        if !success {
            session.state = TaskSessionStatus::Failed;
            session.error_message = error_message;
            session.completed_at_ms = Some(now);
            session.updated_at_ms = now;
            self.store.update_session(session.clone()).await?;
            self.broadcast_state_changed(&session).await;
            return Ok(());
        }

        let queued = self.queues.lock().get_mut(&session_id).and_then(|q| q.drain_one());
        if let Some(queued) = queued {
            session.state = TaskSessionStatus::WaitingForInput;
            session.updated_at_ms = now;
            self.store.update_session(session.clone()).await?;
            self.broadcast_state_changed(&session).await;
            return self.dispatch_prompt(&mut session, queued.prompt, queued.author).await;
        }

        session.state = TaskSessionStatus::WaitingForInput;
        session.updated_at_ms = now;
        self.store.update_session(session.clone()).await?;
        self.broadcast_state_changed(&session).await;

        let notification = kandev_wire::SessionWaitingForInputNotification { session_id: session.id.clone() };
        let payload = serde_json::to_value(&notification).unwrap_or(serde_json::Value::Null);
        self.hub
            .broadcast(
                BroadcastScope::Session(session.id.clone()),
                Envelope::notification(kandev_wire::Action::SessionWaitingForInput.as_str(), payload, now),
            )
            .await;

        Ok(())
    }
}
