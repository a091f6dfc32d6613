// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent subprocess identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a spawned agentctl controller (`TaskSession::agent_execution_id`).
///
/// Unlike the other entity ids this is not generated by us — it comes back
/// from the controller process at spawn time — so it is a plain string
/// newtype rather than a [`crate::define_id!`] id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Coarse lifecycle state of an agent subprocess, as observed by agentctl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Actively streaming a response.
    Working,
    /// Turn completed; awaiting the next prompt.
    WaitingForInput,
    /// Exited with an error the controller could classify.
    Failed(AgentError),
    /// Exited cleanly (no classifiable error).
    Exited,
    /// The controller process itself is gone (crashed, killed, orphaned).
    SessionGone,
}

/// Classification of an agent subprocess failure, surfaced to clients so
/// they can render an actionable message instead of a raw exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentError {
    Unauthorized,
    OutOfCredits,
    NoInternet,
    RateLimited,
    Other,
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentError::Unauthorized => "unauthorized",
            AgentError::OutOfCredits => "out of credits",
            AgentError::NoInternet => "no internet",
            AgentError::RateLimited => "rate limited",
            AgentError::Other => "agent error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_displays_as_inner_string() {
        let id = AgentId::new("actl-9f2b3c");
        assert_eq!(id.to_string(), "actl-9f2b3c");
    }

    #[test]
    fn agent_error_display_is_human_readable() {
        assert_eq!(AgentError::OutOfCredits.to_string(), "out of credits");
    }
}
