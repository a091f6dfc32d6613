// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevctl launch` — starts (or prepares) a session for a task.

use anyhow::Result;
use kandev_core::TaskId;
use kandev_wire::{LaunchIntent, LaunchSessionRequest, LaunchSessionResponse};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(addr: &str, format: OutputFormat, task_id: String, prepare: bool, agent_profile_id: Option<String>) -> Result<()> {
    let mut client = DaemonClient::connect(addr).await?;
    let request = LaunchSessionRequest {
        task_id: TaskId::from(task_id),
        intent: if prepare { LaunchIntent::Prepare } else { LaunchIntent::Create },
        session_id: None,
        agent_profile_id,
    };
    let payload = client.request("session.launch", serde_json::to_value(request)?).await?;
    let response: LaunchSessionResponse = serde_json::from_value(payload)?;

    format_or_json(format, &response, || {
        println!("session {}  state={:?}", response.session_id, response.state);
        if !response.worktree_path.is_empty() {
            println!("worktree {} ({})", response.worktree_path, response.worktree_branch);
        }
    })
}
