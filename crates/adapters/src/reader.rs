// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared stdio reader-loop plumbing used by both dialect adapters.
//!
//! Exactly one reader task pulls from stdout line-by-line, decodes one JSON
//! value per line, and dispatches to (a) a pending-response map keyed by a
//! normalized request id, (b) a notification handler, or (c) a request
//! handler. Numeric ids may arrive as JSON numbers or strings — both are
//! normalized to a string key before lookup.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Normalize a JSON-RPC id (string or number) into a string key.
pub fn normalize_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A single-use map of in-flight calls, resolved by the reader task.
#[derive(Default, Clone)]
pub struct PendingCalls {
    inner: Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>,
}

impl PendingCalls {
    /// Registers a new in-flight call and returns its response receiver.
    pub fn register(&self, id: impl Into<String>) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().insert(id.into(), tx);
        rx
    }

    /// Resolves a pending call with its response. Returns `false` if no
    /// call with that id is outstanding (already answered, or unknown).
    pub fn resolve(&self, id: &str, response: Value) -> bool {
        if let Some(tx) = self.inner.lock().remove(id) {
            let _ = tx.send(response);
            true
        } else {
            false
        }
    }

    /// Drops every outstanding sender, which resolves their receivers with
    /// `RecvError` — called once the reader loop terminates.
    pub fn cancel_all(&self) {
        self.inner.lock().clear();
    }
}

/// A decoded line, tagged so the caller can route it without re-parsing.
pub enum DecodedLine {
    /// Has `result`/`error` + `id` — a response to one of our calls.
    Response { id: String, payload: Value },
    /// Has `method`, no `id` — fire-and-forget.
    Notification { method: String, payload: Value },
    /// Has `method` + `id` — expects a reply.
    Request { id: Value, method: String, payload: Value },
    /// Didn't parse as JSON, or didn't match any of the shapes above.
    Unrecognized,
}

/// Classify one line of agent stdout into a [`DecodedLine`].
pub fn decode_line(line: &str) -> DecodedLine {
    let Ok(json) = serde_json::from_str::<Value>(line) else {
        return DecodedLine::Unrecognized;
    };
    let id = json.get("id").cloned();
    let method = json.get("method").and_then(|m| m.as_str()).map(str::to_string);

    match (id, method) {
        (Some(id), Some(method)) => DecodedLine::Request { id, method, payload: json },
        (None, Some(method)) => DecodedLine::Notification { method, payload: json },
        (Some(id), None) => match normalize_id(&id) {
            Some(id) => DecodedLine::Response { id, payload: json },
            None => DecodedLine::Unrecognized,
        },
        (None, None) => DecodedLine::Unrecognized,
    }
}
