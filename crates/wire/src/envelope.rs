// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outward WebSocket frame. Every message between a client and the
//! daemon is one `Envelope`; `action` plus `frame_type` determine how
//! `payload` should be interpreted (callers downcast it with
//! `serde_json::from_value` against the types in [`crate::action`]).

use serde::{Deserialize, Serialize};

/// `type` discriminant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Request,
    Response,
    Notification,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Present on `request`/`response` pairs; the response echoes the
    /// request's id so the caller can correlate them. Absent on
    /// `notification` frames, which have no reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub payload: serde_json::Value,
    pub timestamp: u64,
}

impl Envelope {
    pub fn request(id: impl Into<String>, action: impl Into<String>, payload: serde_json::Value, now_ms: u64) -> Self {
        Self { id: Some(id.into()), frame_type: FrameType::Request, action: Some(action.into()), payload, timestamp: now_ms }
    }

    pub fn response(id: impl Into<String>, payload: serde_json::Value, now_ms: u64) -> Self {
        Self { id: Some(id.into()), frame_type: FrameType::Response, action: None, payload, timestamp: now_ms }
    }

    pub fn notification(action: impl Into<String>, payload: serde_json::Value, now_ms: u64) -> Self {
        Self { id: None, frame_type: FrameType::Notification, action: Some(action.into()), payload, timestamp: now_ms }
    }

    pub fn error(id: Option<String>, payload: serde_json::Value, now_ms: u64) -> Self {
        Self { id, frame_type: FrameType::Error, action: None, payload, timestamp: now_ms }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
