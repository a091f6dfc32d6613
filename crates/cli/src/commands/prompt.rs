// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevctl prompt` — sends a prompt to a session, queueing it if the
//! session is mid-turn.

use anyhow::Result;
use kandev_core::{TaskId, TaskSessionId};
use kandev_wire::PromptTaskRequest;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    addr: &str,
    _format: OutputFormat,
    task_id: String,
    session_id: String,
    prompt: String,
    model: Option<String>,
    plan_mode: bool,
) -> Result<()> {
    let mut client = DaemonClient::connect(addr).await?;
    let request = PromptTaskRequest {
        task_id: TaskId::from(task_id),
        session_id: TaskSessionId::from(session_id),
        prompt,
        model,
        plan_mode,
        attachments: Vec::new(),
    };
    client.request("orchestrator.prompt", serde_json::to_value(request)?).await?;
    println!("prompt sent");
    Ok(())
}
