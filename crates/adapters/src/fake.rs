// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `AgentAdapter` double for orchestrator-level tests that should
//! not depend on a real agent binary existing on PATH.

use crate::adapter::{AdapterError, AgentAdapter, AgentInfo, PermissionHandler};
use async_trait::async_trait;
use kandev_core::SessionUpdate;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct Calls {
    initialized: bool,
    sessions: Vec<String>,
    prompts: Vec<String>,
    cancels: u32,
    closed: bool,
}

/// Records every call it receives and lets the test push `SessionUpdate`s
/// onto the same channel a real adapter would use.
#[derive(Clone)]
pub struct FakeAgentAdapter {
    calls: Arc<Mutex<Calls>>,
    updates_tx: mpsc::Sender<SessionUpdate>,
    updates_rx: Arc<Mutex<Option<mpsc::Receiver<SessionUpdate>>>>,
    permission_handler: Arc<Mutex<Option<PermissionHandler>>>,
    next_session_id: Arc<Mutex<u64>>,
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(crate::adapter::UPDATES_CHANNEL_CAPACITY);
        Self {
            calls: Arc::new(Mutex::new(Calls::default())),
            updates_tx,
            updates_rx: Arc::new(Mutex::new(Some(updates_rx))),
            permission_handler: Arc::new(Mutex::new(None)),
            next_session_id: Arc::new(Mutex::new(0)),
        }
    }

    /// Pushes an update as if the agent emitted it, bypassing `take_updates`.
    pub fn push_update(&self, update: SessionUpdate) {
        let _ = self.updates_tx.try_send(update);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().prompts.clone()
    }

    pub fn cancel_count(&self) -> u32 {
        self.calls.lock().cancels
    }

    pub fn is_closed(&self) -> bool {
        self.calls.lock().closed
    }

    pub fn permission_handler(&self) -> Option<PermissionHandler> {
        self.permission_handler.lock().clone()
    }
}

impl Default for FakeAgentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn initialize(&mut self) -> Result<AgentInfo, AdapterError> {
        self.calls.lock().initialized = true;
        Ok(AgentInfo { name: "fake".into(), version: "0.0.0".into() })
    }

    async fn new_session(&mut self) -> Result<String, AdapterError> {
        let mut next = self.next_session_id.lock();
        *next += 1;
        let session_id = format!("fake-session-{next}");
        self.calls.lock().sessions.push(session_id.clone());
        Ok(session_id)
    }

    async fn load_session(&mut self, session_id: &str) -> Result<(), AdapterError> {
        self.calls.lock().sessions.push(session_id.to_string());
        Ok(())
    }

    async fn prompt(&mut self, text: &str) -> Result<(), AdapterError> {
        self.calls.lock().prompts.push(text.to_string());
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), AdapterError> {
        self.calls.lock().cancels += 1;
        Ok(())
    }

    fn take_updates(&mut self) -> Option<mpsc::Receiver<SessionUpdate>> {
        self.updates_rx.lock().take()
    }

    fn set_permission_handler(&mut self, handler: PermissionHandler) {
        *self.permission_handler.lock() = Some(handler);
    }

    async fn close(&mut self) {
        self.calls.lock().closed = true;
    }
}
