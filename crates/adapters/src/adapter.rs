// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `AgentAdapter` capability set. Concrete dialects (`acp`, `codex`)
//! each own one subprocess's stdin/stdout and implement this trait; callers
//! hold a `Box<dyn AgentAdapter>` and never match on which dialect it is.

use async_trait::async_trait;
use kandev_core::SessionUpdate;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("adapter not initialized")]
    NotInitialized,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("adapter closed")]
    Closed,
}

impl From<AdapterError> for kandev_core::CoreError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotInitialized => kandev_core::CoreError::Transport("adapter not initialized".into()),
            AdapterError::Transport(m) => kandev_core::CoreError::Transport(m),
            AdapterError::Protocol(m) => kandev_core::CoreError::Protocol(m),
            AdapterError::Closed => kandev_core::CoreError::Transport("adapter closed".into()),
        }
    }
}

/// Recorded on successful `Initialize`.
#[derive(Debug, Clone, Default)]
pub struct AgentInfo {
    pub name: String,
    pub version: String,
}

/// An incoming approval-request RPC from the agent, normalized across dialects.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub tool_call_id: String,
    pub title: String,
    pub action_type: String,
    pub action_details: serde_json::Map<String, serde_json::Value>,
    pub options: Vec<kandev_core::PermissionOption>,
}

#[derive(Debug, Clone)]
pub struct PermissionResponse {
    pub option_id: Option<String>,
    pub cancelled: bool,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Injected by the orchestrator so the adapter's reader loop never blocks on
/// a human decision — each request is dispatched on its own task, and the
/// handler itself may take as long as it needs.
pub type PermissionHandler = Arc<dyn Fn(PermissionRequest) -> BoxFuture<PermissionResponse> + Send + Sync>;

/// Normalizes one agent dialect into the internal `SessionUpdate` stream.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Performs the agent's handshake. Fails with `NotInitialized` on any
    /// transport error.
    async fn initialize(&mut self) -> Result<AgentInfo, AdapterError>;

    /// Creates a fresh conversation, returning its dialect-specific session id.
    async fn new_session(&mut self) -> Result<String, AdapterError>;

    /// Resumes an existing conversation.
    async fn load_session(&mut self, session_id: &str) -> Result<(), AdapterError>;

    /// Sends a text-only user message. Does not block for completion.
    async fn prompt(&mut self, text: &str) -> Result<(), AdapterError>;

    /// Cancels the current turn.
    async fn cancel(&mut self) -> Result<(), AdapterError>;

    /// Takes ownership of the outbound update channel. Returns `None` if
    /// already taken — there is exactly one consumer.
    fn take_updates(&mut self) -> Option<mpsc::Receiver<SessionUpdate>>;

    /// Injects the permission-request callback. The handler may block; the
    /// adapter's reader loop never does.
    fn set_permission_handler(&mut self, handler: PermissionHandler);

    /// Cancels the reader loop and closes the updates channel exactly once.
    async fn close(&mut self);
}

/// Capacity of the adapter's outbound update channel. If full, the adapter
/// drops the update and logs a warning rather than blocking the reader loop
/// — a deadlocked reader would starve the agent's own stdout pipe.
pub const UPDATES_CHANNEL_CAPACITY: usize = 100;
