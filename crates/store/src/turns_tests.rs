// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn open_turn_is_open_until_closed() {
    let store = Store::open_in_memory().unwrap();
    let session_id = TaskSessionId::new();
    let task_id = TaskId::new();
    seed_session(&store, session_id, task_id).await;

    let turn = store.open_turn(&session_id, &task_id, 1).await.unwrap();
    assert!(turn.completed_at_ms.is_none());

    store.close_turn(&turn.id, serde_json::Map::new(), 9).await.unwrap();
    let loaded = store.get_turn(&turn.id).await.unwrap();
    assert_eq!(loaded.completed_at_ms, Some(9));
}

#[tokio::test]
async fn close_turn_missing_is_not_found() {
    let store = Store::open_in_memory().unwrap();
    let err = store.close_turn(&TurnId::new(), serde_json::Map::new(), 1).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { what: "turn", .. }));
}

#[tokio::test]
async fn list_turns_orders_by_start_time() {
    let store = Store::open_in_memory().unwrap();
    let session_id = TaskSessionId::new();
    let task_id = TaskId::new();
    seed_session(&store, session_id, task_id).await;

    let first = store.open_turn(&session_id, &task_id, 1).await.unwrap();
    let second = store.open_turn(&session_id, &task_id, 2).await.unwrap();

    let turns = store.list_turns(&session_id).await.unwrap();
    assert_eq!(turns.iter().map(|t| t.id).collect::<Vec<_>>(), vec![first.id, second.id]);
}

async fn seed_session(store: &Store, session_id: TaskSessionId, task_id: TaskId) {
    use kandev_core::TaskSessionBuilder;
    let mut session = TaskSessionBuilder::default().task_id(task_id).build();
    session.id = session_id;
    store.create_session(session).await.unwrap();
}
