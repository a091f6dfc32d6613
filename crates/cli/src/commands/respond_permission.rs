// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevctl respond-permission` — answers a pending human-in-the-loop
//! permission request, either by option id or by cancelling it.

use anyhow::Result;
use kandev_core::{PermissionId, TaskSessionId};
use kandev_wire::PermissionRespondRequest;

use crate::client::DaemonClient;

pub async fn run(addr: &str, session_id: String, pending_id: String, option_id: Option<String>, cancel: bool) -> Result<()> {
    let mut client = DaemonClient::connect(addr).await?;
    let request = PermissionRespondRequest {
        session_id: TaskSessionId::from(session_id),
        pending_id: PermissionId::from(pending_id),
        option_id,
        cancelled: cancel,
    };
    client.request("permission.respond", serde_json::to_value(request)?).await?;
    println!("permission answered");
    Ok(())
}
