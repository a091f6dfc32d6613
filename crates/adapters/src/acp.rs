// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dialect A: ACP. No explicit handshake — the process is ready the moment
//! it accepts stdin. `session/new` carries a cwd and an empty MCP server
//! list; cancellation is a fire-and-forget `session/cancel` notification.

use crate::adapter::{AdapterError, AgentAdapter, AgentInfo, PermissionHandler, PermissionRequest, PermissionResponse, UPDATES_CHANNEL_CAPACITY};
use crate::reader::{decode_line, DecodedLine, PendingCalls};
use async_trait::async_trait;
use kandev_core::SessionUpdate;
use parking_lot::Mutex as SyncMutex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

type SharedStdin = Arc<AsyncMutex<Option<ChildStdin>>>;
type SharedHandler = Arc<SyncMutex<Option<PermissionHandler>>>;

pub struct ACPAdapter {
    child: Option<Child>,
    stdin: SharedStdin,
    cwd: PathBuf,
    pending: PendingCalls,
    next_id: AtomicI64,
    updates_rx: Option<mpsc::Receiver<SessionUpdate>>,
    permission_handler: SharedHandler,
    acp_session_id: Option<String>,
    reader_task: Option<tokio::task::JoinHandle<()>>,
}

impl ACPAdapter {
    /// Takes ownership of an already-spawned child process's stdio.
    pub fn new(mut child: Child, cwd: PathBuf) -> Result<Self, AdapterError> {
        let stdin: SharedStdin = Arc::new(AsyncMutex::new(Some(
            child.stdin.take().ok_or_else(|| AdapterError::Transport("missing stdin".into()))?,
        )));
        let stdout = child.stdout.take().ok_or_else(|| AdapterError::Transport("missing stdout".into()))?;
        let (updates_tx, updates_rx) = mpsc::channel(UPDATES_CHANNEL_CAPACITY);
        let permission_handler: SharedHandler = Arc::new(SyncMutex::new(None));

        let pending = PendingCalls::default();
        let reader_task = {
            let pending = pending.clone();
            let stdin = stdin.clone();
            let handler = permission_handler.clone();
            tokio::spawn(async move {
                run_reader(stdout, pending, updates_tx, stdin, handler).await;
            })
        };

        Ok(Self {
            child: Some(child),
            stdin,
            cwd,
            pending,
            next_id: AtomicI64::new(1),
            updates_rx: Some(updates_rx),
            permission_handler,
            acp_session_id: None,
            reader_task: Some(reader_task),
        })
    }

    fn next_request_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, AdapterError> {
        let id = self.next_request_id();
        let rx = self.pending.register(id.to_string());
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        write_line(&self.stdin, &request).await?;
        rx.await.map_err(|_| AdapterError::Closed)
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), AdapterError> {
        let notification = json!({"jsonrpc": "2.0", "method": method, "params": params});
        write_line(&self.stdin, &notification).await
    }
}

async fn write_line(stdin: &SharedStdin, value: &Value) -> Result<(), AdapterError> {
    let mut guard = stdin.lock().await;
    let stdin = guard.as_mut().ok_or(AdapterError::Closed)?;
    let mut line = serde_json::to_vec(value).map_err(|e| AdapterError::Protocol(e.to_string()))?;
    line.push(b'\n');
    stdin.write_all(&line).await.map_err(|e| AdapterError::Transport(e.to_string()))
}

async fn run_reader(
    stdout: tokio::process::ChildStdout,
    pending: PendingCalls,
    updates_tx: mpsc::Sender<SessionUpdate>,
    stdin: SharedStdin,
    handler: SharedHandler,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match decode_line(&line) {
                DecodedLine::Response { id, payload } => {
                    let result = payload.get("result").or_else(|| payload.get("error")).cloned().unwrap_or(Value::Null);
                    pending.resolve(&id, result);
                }
                DecodedLine::Notification { method, payload } if method == "session/update" => {
                    if let Some(params) = payload.get("params") {
                        match serde_json::from_value::<SessionUpdate>(params.clone()) {
                            Ok(update) => {
                                if updates_tx.try_send(update).is_err() {
                                    tracing::warn!("acp updates channel full or closed, dropping update");
                                }
                            }
                            Err(err) => tracing::warn!(error = %err, "failed to decode acp session/update"),
                        }
                    }
                }
                DecodedLine::Notification { method, .. } => {
                    tracing::debug!(method = %method, "unhandled acp notification");
                }
                DecodedLine::Request { id, method, payload } if method == "session/requestPermission" => {
                    let stdin = stdin.clone();
                    let handler = handler.lock().clone();
                    tokio::spawn(async move {
                        respond_to_permission(stdin, id, payload, handler).await;
                    });
                }
                DecodedLine::Request { method, .. } => {
                    tracing::debug!(method = %method, "unhandled acp request, no reply sent");
                }
                DecodedLine::Unrecognized => {
                    tracing::debug!(line = %line, "unrecognized acp stdout line");
                }
            },
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "acp stdout read error");
                break;
            }
        }
    }
    pending.cancel_all();
}

/// Always sends a reply, auto-approving when no handler is registered —
/// matching the same must-always-answer contract as the Codex dialect.
async fn respond_to_permission(stdin: SharedStdin, id: Value, payload: Value, handler: Option<PermissionHandler>) {
    let params = payload.get("params").cloned().unwrap_or(Value::Null);
    let request = PermissionRequest {
        tool_call_id: params.get("toolCallId").and_then(Value::as_str).unwrap_or_default().to_string(),
        title: params.get("title").and_then(Value::as_str).unwrap_or("permission request").to_string(),
        action_type: params.get("actionType").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        action_details: params.as_object().cloned().unwrap_or_default(),
        options: Vec::new(),
    };

    let response = match handler {
        Some(handler) => handler(request).await,
        None => {
            tracing::info!("auto-approving acp permission request, no handler registered");
            PermissionResponse { option_id: None, cancelled: false }
        }
    };

    let outcome = if response.cancelled {
        json!({"outcome": "cancelled"})
    } else {
        json!({"outcome": "selected", "optionId": response.option_id})
    };

    let reply = json!({"jsonrpc": "2.0", "id": id, "result": outcome});
    if let Err(err) = write_line(&stdin, &reply).await {
        tracing::warn!(error = %err, "failed to reply to acp permission request");
    }
}

#[async_trait]
impl AgentAdapter for ACPAdapter {
    async fn initialize(&mut self) -> Result<AgentInfo, AdapterError> {
        Ok(AgentInfo { name: "acp".into(), version: "unknown".into() })
    }

    async fn new_session(&mut self) -> Result<String, AdapterError> {
        let result = self
            .call("session/new", json!({"cwd": self.cwd, "mcpServers": []}))
            .await?;
        let session_id = result
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::Protocol("session/new missing sessionId".into()))?
            .to_string();
        self.acp_session_id = Some(session_id.clone());
        Ok(session_id)
    }

    async fn load_session(&mut self, session_id: &str) -> Result<(), AdapterError> {
        self.call("session/load", json!({"sessionId": session_id, "cwd": self.cwd})).await?;
        self.acp_session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn prompt(&mut self, text: &str) -> Result<(), AdapterError> {
        let session_id = self.acp_session_id.clone().ok_or(AdapterError::NotInitialized)?;
        self.call("session/prompt", json!({"sessionId": session_id, "prompt": [{"type": "text", "text": text}]})).await?;
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), AdapterError> {
        let session_id = self.acp_session_id.clone().ok_or(AdapterError::NotInitialized)?;
        self.notify("session/cancel", json!({"sessionId": session_id})).await
    }

    fn take_updates(&mut self) -> Option<mpsc::Receiver<SessionUpdate>> {
        self.updates_rx.take()
    }

    fn set_permission_handler(&mut self, handler: PermissionHandler) {
        *self.permission_handler.lock() = Some(handler);
    }

    async fn close(&mut self) {
        self.pending.cancel_all();
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.stdin.lock().await.take();
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
    }
}

#[cfg(test)]
#[path = "acp_tests.rs"]
mod tests;
