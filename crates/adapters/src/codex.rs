// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dialect B: Codex. Requires an explicit `initialize` request followed by
//! an `initialized` notification before any other call is valid. Sessions
//! are called "threads"; a turn's tool activity arrives as paired
//! `item/started` / `item/completed` notifications, and approval requests
//! are incoming RPCs the adapter must always answer — even with no
//! registered handler, because a stuck agent cannot be cancelled cleanly.

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

const APPROVAL_POLICY: &str = "never";
const SANDBOX_POLICY: &str = "danger-full-access";

type SharedStdin = Arc<AsyncMutex<Option<ChildStdin>>>;
type SharedHandler = Arc<SyncMutex<Option<PermissionHandler>>>;

pub struct CodexAdapter {
    child: Option<Child>,
    stdin: SharedStdin,
    cwd: PathBuf,
    pending: PendingCalls,
    next_id: AtomicI64,
    updates_rx: Option<mpsc::Receiver<SessionUpdate>>,
    permission_handler: SharedHandler,
    thread_id: Option<String>,
    current_turn_id: Option<String>,
    reader_task: Option<tokio::task::JoinHandle<()>>,
}

impl CodexAdapter {
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
            thread_id: None,
            current_turn_id: None,
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
                DecodedLine::Notification { method, payload } => {
                    handle_notification(&method, &payload, &updates_tx).await;
                }
                DecodedLine::Request { id, method, payload } => {
                    if is_approval_method(&method) {
                        let stdin = stdin.clone();
                        let handler = handler.lock().clone();
                        tokio::spawn(async move {
                            respond_to_approval(stdin, id, &method, payload, handler).await;
                        });
                    } else {
                        tracing::debug!(method = %method, "unhandled codex request, no reply sent");
                    }
                }
                DecodedLine::Unrecognized => {
                    tracing::debug!(line = %line, "unrecognized codex stdout line");
                }
            },
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "codex stdout read error");
                break;
            }
        }
    }
    pending.cancel_all();
}

fn is_approval_method(method: &str) -> bool {
    method == "item/commandExecution/requestApproval" || method == "item/fileChange/requestApproval"
}

/// Always sends a reply — `{decision: "approve"}` when no handler is
/// registered, or when the handler itself errors, since a stuck agent
/// cannot be cancelled cleanly.
async fn respond_to_approval(stdin: SharedStdin, id: Value, method: &str, payload: Value, handler: Option<PermissionHandler>) {
    let params = payload.get("params").cloned().unwrap_or(Value::Null);
    let request = PermissionRequest {
        tool_call_id: params.get("callId").and_then(Value::as_str).unwrap_or_default().to_string(),
        title: params.get("title").and_then(Value::as_str).unwrap_or(method).to_string(),
        action_type: method.to_string(),
        action_details: params.as_object().cloned().unwrap_or_default(),
        options: Vec::new(),
    };

    let response = match handler {
        Some(handler) => handler(request).await,
        None => {
            tracing::info!(method = %method, "auto-approving codex request, no handler registered");
            PermissionResponse { option_id: None, cancelled: false }
        }
    };

    let decision = if response.cancelled {
        Value::String("reject".into())
    } else {
        match response.option_id {
            Some(option_id) => Value::String(option_id),
            None => Value::String("approve".into()),
        }
    };

    let reply = json!({"jsonrpc": "2.0", "id": id, "result": {"decision": decision}});
    if let Err(err) = write_line(&stdin, &reply).await {
        tracing::warn!(error = %err, "failed to reply to codex approval request");
    }
}

async fn handle_notification(method: &str, payload: &Value, updates_tx: &mpsc::Sender<SessionUpdate>) {
    let params = payload.get("params").cloned().unwrap_or(Value::Null);
    match method {
        "item/started" | "item/completed" => {
            let item_type = params.get("item").and_then(|i| i.get("type")).and_then(Value::as_str).unwrap_or("");
            if item_type != "commandExecution" && item_type != "fileChange" {
                return;
            }
            match item_event_to_session_update(method, &params) {
                Some(update) => {
                    if updates_tx.try_send(update).is_err() {
                        tracing::warn!("codex updates channel full or closed, dropping update");
                    }
                }
                None => tracing::warn!(method = %method, "failed to translate codex item event"),
            }
        }
        "turn/completed" => {
            let success = params.get("success").and_then(Value::as_bool).unwrap_or(true);
            match terminal_update(&params, success) {
                Some(update) => {
                    if updates_tx.try_send(update).is_err() {
                        tracing::warn!("codex updates channel full or closed, dropping terminal update");
                    }
                }
                None => tracing::warn!("failed to translate codex turn/completed"),
            }
        }
        other => tracing::debug!(method = %other, "unhandled codex notification"),
    }
}

fn item_event_to_session_update(method: &str, params: &Value) -> Option<SessionUpdate> {
    let session_id = params.get("threadId").and_then(Value::as_str)?.to_string();
    let turn_id = params.get("turnId").and_then(Value::as_str).map(str::to_string);
    let item = params.get("item")?;
    let tool_call_id = item.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let payload = item.clone();

    let mut envelope = serde_json::Map::new();
    envelope.insert("session_id".into(), Value::String(session_id));
    if let Some(t) = turn_id {
        envelope.insert("turn_id".into(), Value::String(t));
    }
    envelope.insert("tool_call_id".into(), Value::String(tool_call_id));
    envelope.insert("payload".into(), payload);
    if method == "item/started" {
        envelope.insert("type".into(), Value::String("tool_call".into()));
        let title = item.get("command").and_then(Value::as_str).or_else(|| item.get("path").and_then(Value::as_str)).unwrap_or(item.get("type").and_then(Value::as_str).unwrap_or("tool")).to_string();
        envelope.insert("title".into(), Value::String(title));
    } else {
        envelope.insert("type".into(), Value::String("tool_update".into()));
    }
    serde_json::from_value(Value::Object(envelope)).ok()
}

fn terminal_update(params: &Value, success: bool) -> Option<SessionUpdate> {
    let session_id = params.get("threadId").and_then(Value::as_str)?.to_string();
    let turn_id = params.get("turnId").and_then(Value::as_str).map(str::to_string);
    let mut envelope = serde_json::Map::new();
    envelope.insert("session_id".into(), Value::String(session_id));
    if let Some(t) = turn_id {
        envelope.insert("turn_id".into(), Value::String(t));
    }
    if success {
        envelope.insert("type".into(), Value::String("complete".into()));
        envelope.insert("success".into(), Value::Bool(true));
    } else {
        let message = params.get("error").and_then(Value::as_str).unwrap_or("turn failed").to_string();
        envelope.insert("type".into(), Value::String("error".into()));
        envelope.insert("message".into(), Value::String(message));
        envelope.insert("transient".into(), Value::Bool(false));
    }
    serde_json::from_value(Value::Object(envelope)).ok()
}

#[async_trait]
impl AgentAdapter for CodexAdapter {
    async fn initialize(&mut self) -> Result<AgentInfo, AdapterError> {
        let result = self.call("initialize", json!({"clientInfo": {"name": "kandevd", "version": env!("CARGO_PKG_VERSION")}})).await?;
        self.notify("initialized", json!({})).await?;
        let name = result.get("agentInfo").and_then(|i| i.get("name")).and_then(Value::as_str).unwrap_or("codex").to_string();
        let version = result.get("agentInfo").and_then(|i| i.get("version")).and_then(Value::as_str).unwrap_or("unknown").to_string();
        Ok(AgentInfo { name, version })
    }

    async fn new_session(&mut self) -> Result<String, AdapterError> {
        let result = self
            .call(
                "thread/start",
                json!({"cwd": self.cwd, "approvalPolicy": APPROVAL_POLICY, "sandboxPolicy": SANDBOX_POLICY}),
            )
            .await?;
        let thread_id = result
            .get("threadId")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::Protocol("thread/start missing threadId".into()))?
            .to_string();
        self.thread_id = Some(thread_id.clone());
        Ok(thread_id)
    }

    async fn load_session(&mut self, session_id: &str) -> Result<(), AdapterError> {
        self.call(
            "thread/resume",
            json!({
                "threadId": session_id,
                "cwd": self.cwd,
                "approvalPolicy": APPROVAL_POLICY,
                "sandboxPolicy": SANDBOX_POLICY,
            }),
        )
        .await?;
        self.thread_id = Some(session_id.to_string());
        Ok(())
    }

    async fn prompt(&mut self, text: &str) -> Result<(), AdapterError> {
        let thread_id = self.thread_id.clone().ok_or(AdapterError::NotInitialized)?;
        let result = self.call("turn/create", json!({"threadId": thread_id, "input": [{"type": "text", "text": text}]})).await?;
        self.current_turn_id = result.get("turnId").and_then(Value::as_str).map(str::to_string);
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), AdapterError> {
        let thread_id = self.thread_id.clone().ok_or(AdapterError::NotInitialized)?;
        let turn_id = self.current_turn_id.clone();
        self.call("turn/interrupt", json!({"threadId": thread_id, "turnId": turn_id})).await?;
        Ok(())
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
#[path = "codex_tests.rs"]
mod tests;
