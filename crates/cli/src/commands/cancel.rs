// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevctl cancel` — cancels a session's in-flight agent turn.

use anyhow::Result;
use kandev_core::TaskSessionId;
use kandev_wire::AgentCancelRequest;

use crate::client::DaemonClient;

pub async fn run(addr: &str, session_id: String) -> Result<()> {
    let mut client = DaemonClient::connect(addr).await?;
    let request = AgentCancelRequest { session_id: TaskSessionId::from(session_id) };
    client.request("agent.cancel", serde_json::to_value(request)?).await?;
    println!("cancel requested");
    Ok(())
}
