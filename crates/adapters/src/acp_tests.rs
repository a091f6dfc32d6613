// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spawn_cat() -> Child {
    tokio::process::Command::new("cat")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("spawn cat")
}

#[tokio::test]
async fn initialize_is_a_no_op_handshake() {
    let child = spawn_cat();
    let mut adapter = ACPAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    let info = adapter.initialize().await.unwrap();
    assert_eq!(info.name, "acp");
    adapter.close().await;
}

#[tokio::test]
async fn prompt_before_new_session_fails_with_not_initialized() {
    let child = spawn_cat();
    let mut adapter = ACPAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    let err = adapter.prompt("hello").await.unwrap_err();
    assert!(matches!(err, AdapterError::NotInitialized));
    adapter.close().await;
}

#[tokio::test]
async fn take_updates_returns_the_receiver_exactly_once() {
    let child = spawn_cat();
    let mut adapter = ACPAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    assert!(adapter.take_updates().is_some());
    assert!(adapter.take_updates().is_none());
    adapter.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_stops_the_reader() {
    let child = spawn_cat();
    let mut adapter = ACPAdapter::new(child, PathBuf::from("/tmp")).unwrap();
    adapter.close().await;
    adapter.close().await;
}
