// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevctl status` — lists every task the daemon currently knows about.

use anyhow::Result;
use kandev_wire::OrchestratorStatusResponse;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn run(addr: &str, format: OutputFormat) -> Result<()> {
    let mut client = DaemonClient::connect(addr).await?;
    let payload = client.request("orchestrator.status", serde_json::json!({})).await?;
    let response: OrchestratorStatusResponse = serde_json::from_value(payload)?;

    format_or_json(format, &response.tasks, || {
        if response.tasks.is_empty() {
            println!("No tasks");
            return;
        }
        for task in &response.tasks {
            println!("{}  {:<16}  {}", task.id, format!("{:?}", task.state), task.title);
        }
    })
}
