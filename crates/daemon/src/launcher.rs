// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! How the orchestrator turns a [`TaskSession`] into a live [`AgentAdapter`].
//! Kept behind a trait so orchestrator tests can substitute
//! `kandev_adapters::fake::FakeAgentAdapter` instead of spawning a real
//! subprocess.

use async_trait::async_trait;
use kandev_adapters::adapter::AdapterError;
use kandev_adapters::supervisor::{self, Dialect, SpawnConfig};
use kandev_adapters::AgentAdapter;
use kandev_core::TaskSession;
use std::path::PathBuf;
use std::time::Duration;

#[async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn launch(&self, session: &TaskSession) -> Result<Box<dyn AgentAdapter>, AdapterError>;
}

/// Spawns the real agent binary named by the session's snapshot (falling
/// back to `agent_profile_id` itself), speaking the dialect recorded there.
pub struct ProcessAgentLauncher;

#[async_trait]
impl AgentLauncher for ProcessAgentLauncher {
    async fn launch(&self, session: &TaskSession) -> Result<Box<dyn AgentAdapter>, AdapterError> {
        let command = session
            .snapshot
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or(session.agent_profile_id.as_str())
            .to_string();
        let dialect = match session.snapshot.get("dialect").and_then(|v| v.as_str()) {
            Some("codex") => Dialect::Codex,
            _ => Dialect::Acp,
        };
        let cwd = session
            .worktrees
            .first()
            .map(|w| PathBuf::from(&w.path))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = SpawnConfig::new(command, cwd, dialect);
        config.ready_timeout = Duration::from_secs(30);
        supervisor::spawn(config).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use kandev_adapters::fake::FakeAgentAdapter;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Hands back the same [`FakeAgentAdapter`] to every caller so a test can
    /// keep a handle to assert against after launching a session.
    #[derive(Clone, Default)]
    pub struct FakeAgentLauncher {
        last: Arc<Mutex<Option<FakeAgentAdapter>>>,
    }

    impl FakeAgentLauncher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_adapter(&self) -> Option<FakeAgentAdapter> {
            self.last.lock().clone()
        }
    }

    #[async_trait]
    impl AgentLauncher for FakeAgentLauncher {
        async fn launch(&self, _session: &TaskSession) -> Result<Box<dyn AgentAdapter>, AdapterError> {
            let adapter = FakeAgentAdapter::new();
            *self.last.lock() = Some(adapter.clone());
            Ok(Box::new(adapter))
        }
    }
}
