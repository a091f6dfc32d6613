// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery. The daemon keeps no durable record of its own
//! liveness: when it restarts, every session that was `Starting` or
//! `Running` at crash time is marked interrupted unless its adapter's
//! process can be re-attached to.
//!
//! The in-process adapter model means there is no detached controller pid
//! to probe against a restart — a session's adapter dies with the daemon
//! process. Re-attachment therefore only ever applies to a session holding
//! an `acp_session_id` the agent binary itself can resume; everything else
//! is marked interrupted and left for the operator to relaunch.

use crate::orchestrator::Orchestrator;
use kandev_core::{Clock, CoreResult, TaskSessionStatus};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn recover(orchestrator: &Arc<Orchestrator>) -> CoreResult<()> {
    let tasks = orchestrator.store.list_tasks().await?;
    let mut recovered = 0;
    let mut interrupted = 0;

    for task in tasks {
        let sessions = orchestrator.store.list_for_task(&task.id).await?;
        for mut session in sessions {
            if !matches!(session.state, TaskSessionStatus::Starting | TaskSessionStatus::Running) {
                continue;
            }

            if session.acp_session_id().is_some() {
                match orchestrator.start_adapter(&mut session).await {
                    Ok(()) => {
                        recovered += 1;
                        continue;
                    }
                    Err(err) => warn!(session_id = %session.id, error = %err, "failed to re-attach session on restart, marking interrupted"),
                }
            }

            session.state = TaskSessionStatus::Cancelled;
            session.error_message = Some("interrupted".to_string());
            session.completed_at_ms = Some(orchestrator.clock.epoch_ms());
            session.updated_at_ms = orchestrator.clock.epoch_ms();
            orchestrator.store.update_session(session.clone()).await?;
            orchestrator.broadcast_state_changed(&session).await;
            interrupted += 1;
        }
    }

    info!(recovered, interrupted, "startup recovery complete");
    Ok(())
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
