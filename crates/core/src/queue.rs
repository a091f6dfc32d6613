// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A session's FIFO prompt queue, drained one item per completed turn.

use crate::task::{AuthorType, TaskId, TaskSessionId};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a queued message.
    pub struct QueuedMessageId("qmg-");
}

/// An auto-start or user prompt held while a session is RUNNING or STARTING.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: QueuedMessageId,
    pub session_id: TaskSessionId,
    pub task_id: TaskId,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub author: AuthorType,
    #[serde(default)]
    pub plan_mode: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub queued_at_ms: u64,
}

impl QueuedMessage {
    pub fn new(session_id: TaskSessionId, task_id: TaskId, prompt: impl Into<String>, author: AuthorType, now_ms: u64) -> Self {
        Self {
            id: QueuedMessageId::new(),
            session_id,
            task_id,
            prompt: prompt.into(),
            model: None,
            author,
            plan_mode: false,
            attachments: Vec::new(),
            queued_at_ms: now_ms,
        }
    }
}

/// A per-session FIFO queue, drained one message per completed turn.
#[derive(Debug, Default)]
pub struct SessionQueue {
    items: std::collections::VecDeque<QueuedMessage>,
}

impl SessionQueue {
    pub fn push(&mut self, msg: QueuedMessage) {
        self.items.push_back(msg);
    }

    /// Drain at most one message, per the queue-drain policy in the
    /// orchestrator's turn-completion handler.
    pub fn drain_one(&mut self) -> Option<QueuedMessage> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_fifo_one_at_a_time() {
        let mut q = SessionQueue::default();
        let task_id = TaskId::new();
        let session_id = TaskSessionId::new();
        q.push(QueuedMessage::new(session_id.clone(), task_id.clone(), "first", AuthorType::User, 1));
        q.push(QueuedMessage::new(session_id, task_id, "second", AuthorType::User, 2));

        let first = q.drain_one().expect("first item");
        assert_eq!(first.prompt, "first");
        assert_eq!(q.len(), 1);
    }
}
