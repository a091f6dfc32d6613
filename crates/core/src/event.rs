// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The internal event vocabulary: normalized `SessionUpdate`s coming up from
//! a [`crate::agent::AgentId`]'s adapter, plus the orchestrator-level
//! lifecycle events derived from them. Tagged for JSON so the daemon can
//! persist and replay them without a bespoke binary format.

use crate::permission::PermissionId;
use crate::task::{MessageId, TaskId, TaskSessionId, TurnId, WorkflowStepId};
use serde::{Deserialize, Serialize};

/// A piece of streamed content that may arrive as a plain string or as an
/// array of typed parts — the Codex dialect's `content`/`summary` shape.
/// Implementations MUST accept both; this type makes that explicit instead
/// of leaving it as an untyped blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StringOrParts {
    Plain(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl<'de> Deserialize<'de> for StringOrParts {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(StringOrParts::Plain(s)),
            serde_json::Value::Array(_) => {
                let parts: Vec<ContentPart> =
                    serde_json::from_value(value).map_err(serde::de::Error::custom)?;
                Ok(StringOrParts::Parts(parts))
            }
            other => Err(serde::de::Error::custom(format!(
                "expected string or array of parts, got {other}"
            ))),
        }
    }
}

impl StringOrParts {
    /// Flatten to a single string, concatenating part text in order.
    pub fn flatten(&self) -> String {
        match self {
            StringOrParts::Plain(s) => s.clone(),
            StringOrParts::Parts(parts) => parts.iter().map(|p| p.text.as_str()).collect(),
        }
    }
}

/// A normalized update emitted by a protocol adapter on its outbound
/// channel, one per agent-originated signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    MessageChunk { session_id: TaskSessionId, turn_id: Option<TurnId>, delta: String },
    ToolCall { session_id: TaskSessionId, turn_id: Option<TurnId>, tool_call_id: String, title: String, payload: serde_json::Value },
    ToolUpdate { session_id: TaskSessionId, turn_id: Option<TurnId>, tool_call_id: String, payload: serde_json::Value },
    Plan { session_id: TaskSessionId, turn_id: Option<TurnId>, content: StringOrParts },
    Reasoning { session_id: TaskSessionId, turn_id: Option<TurnId>, content: StringOrParts },
    Complete { session_id: TaskSessionId, turn_id: Option<TurnId>, success: bool },
    Error { session_id: TaskSessionId, turn_id: Option<TurnId>, message: String, transient: bool },
}

impl SessionUpdate {
    pub fn session_id(&self) -> &TaskSessionId {
        match self {
            SessionUpdate::MessageChunk { session_id, .. }
            | SessionUpdate::ToolCall { session_id, .. }
            | SessionUpdate::ToolUpdate { session_id, .. }
            | SessionUpdate::Plan { session_id, .. }
            | SessionUpdate::Reasoning { session_id, .. }
            | SessionUpdate::Complete { session_id, .. }
            | SessionUpdate::Error { session_id, .. } => session_id,
        }
    }
}

/// Orchestrator-level domain events, persisted and fanned out to
/// subscribers. Distinct from [`SessionUpdate`]: these are the
/// orchestrator's own derived facts (a message got appended, a turn
/// closed), not raw adapter signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionLaunched { session_id: TaskSessionId, task_id: TaskId },
    SessionStateChanged { session_id: TaskSessionId, state: crate::task::TaskSessionStatus },
    TurnStarted { session_id: TaskSessionId, turn_id: TurnId },
    TurnCompleted { session_id: TaskSessionId, turn_id: TurnId },
    MessageAdded { session_id: TaskSessionId, message_id: MessageId },
    WorkflowStepChanged { task_id: TaskId, session_id: TaskSessionId, from_step_id: WorkflowStepId, to_step_id: WorkflowStepId },
    PermissionRequested { session_id: TaskSessionId, permission_id: PermissionId },
    PermissionResolved { session_id: TaskSessionId, permission_id: PermissionId },

    /// Catch-all for forward-compatible event types this build doesn't know
    /// about yet; never produced locally, only accepted on replay.
    #[serde(other, skip_serializing)]
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_or_parts_accepts_plain_string() {
        let v: StringOrParts = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(v.flatten(), "hello");
    }

    #[test]
    fn string_or_parts_accepts_part_array() {
        let v: StringOrParts =
            serde_json::from_str(r#"[{"type":"text","text":"a"},{"type":"text","text":"b"}]"#).unwrap();
        assert_eq!(v.flatten(), "ab");
    }

    #[test]
    fn string_or_parts_round_trips() {
        let original = StringOrParts::Parts(vec![ContentPart { kind: "text".into(), text: "hi".into() }]);
        let json = serde_json::to_value(&original).unwrap();
        let back: StringOrParts = serde_json::from_value(json).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn unknown_event_type_falls_back_to_custom() {
        let e: Event = serde_json::from_str(r#"{"type":"something_new_v7"}"#).unwrap();
        assert!(matches!(e, Event::Custom));
    }
}
