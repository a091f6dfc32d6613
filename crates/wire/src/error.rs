// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("expected a request id on this frame")]
    MissingId,
}

impl From<WireError> for kandev_core::CoreError {
    fn from(err: WireError) -> Self {
        kandev_core::CoreError::Protocol(err.to_string())
    }
}
