// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("background task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<StoreError> for kandev_core::CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { what, id } => kandev_core::CoreError::not_found(what, id),
            StoreError::Conflict(msg) => kandev_core::CoreError::conflict(msg),
            other => kandev_core::CoreError::Internal(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
