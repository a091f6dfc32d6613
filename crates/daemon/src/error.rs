// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon thread every error through [`kandev_core::CoreError`] — every
//! collaborator crate already carries a `#[from]` path into it, so this
//! module only adds the daemon's own process-level failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not acquire daemon lock: already running?")]
    LockFailed(#[source] std::io::Error),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Store(#[from] kandev_store::StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] kandev_core::CoreError),
}
