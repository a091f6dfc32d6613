// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending human-in-the-loop permission requests.
//!
//! Grounded on the old job-runner's decision-broker shape: a request is
//! created when the adapter receives an approval-request RPC from the
//! agent, and destroyed the moment the user (or the session ending)
//! resolves it.

use crate::task::TaskSessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a pending permission request.
    pub struct PermissionId("prm-");
}

/// A single option the user can choose in response to a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOption {
    pub option_id: String,
    pub name: String,
    pub kind: String,
}

/// Where the permission request's continuation should be signalled.
/// `Approve(option_id)` is the answer path; `Cancel` fires when the
/// session ends with the request still outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PermissionSource {
    Approve { option_id: String },
    Cancel,
}

/// A permission request from an agent awaiting a human decision.
///
/// Invariant: at most one pending permission per `tool_call_id` per
/// session — enforced by the orchestrator when inserting into its
/// per-session map, not by this type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub session_id: TaskSessionId,
    pub tool_call_id: String,
    pub title: String,
    pub action_type: String,
    #[serde(default)]
    pub action_details: serde_json::Map<String, serde_json::Value>,
    pub options: Vec<PermissionOption>,
    pub created_at_ms: u64,
}

impl Permission {
    pub fn new(
        session_id: TaskSessionId,
        tool_call_id: impl Into<String>,
        title: impl Into<String>,
        action_type: impl Into<String>,
        options: Vec<PermissionOption>,
        now_ms: u64,
    ) -> Self {
        Self {
            id: PermissionId::new(),
            session_id,
            tool_call_id: tool_call_id.into(),
            title: title.into(),
            action_type: action_type.into(),
            action_details: serde_json::Map::new(),
            options,
            created_at_ms: now_ms,
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&PermissionOption> {
        self.options.iter().find(|o| o.option_id == option_id)
    }
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
