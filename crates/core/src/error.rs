// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy. Every crate's own error enum has a `#[from]` path
//! into [`CoreError`] so a single `ErrorKind` survives to the wire boundary.

use serde::{Deserialize, Serialize};

/// The kind tag carried on the wire (`error.code` in the outward envelope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// stdio closed, HTTP refused, WS dropped.
    Transport,
    /// Malformed JSON, unknown method. Never fatal to the adapter.
    Protocol,
    /// Missing/invalid field in a client request.
    Validation,
    /// Session/task/pending id unknown.
    NotFound,
    /// Transient; callers MAY retry with backoff.
    Conflict,
    /// Everything else.
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Transport => "TRANSPORT_ERROR",
            ErrorKind::Protocol => "PROTOCOL_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Top-level error type threaded through every layer of the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Transport(_) => ErrorKind::Transport,
            CoreError::Protocol(_) => ErrorKind::Protocol,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller may retry this error with backoff.
    ///
    /// Used by the workflow engine's auto-start path: "agent prompt in
    /// progress" and "session reset in progress" are both `Conflict`.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Conflict(_))
    }

    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound { what, id: id.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::Conflict(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_transient() {
        let err = CoreError::conflict("agent prompt in progress");
        assert!(err.is_transient());
        assert_eq!(err.kind().code(), "CONFLICT");
    }

    #[test]
    fn not_found_carries_entity_name() {
        let err = CoreError::not_found("session", "tsess-abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("session"));
    }
}
