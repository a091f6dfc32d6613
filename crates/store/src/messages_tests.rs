// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kandev_core::{AuthorType, MessageKind, TaskSessionBuilder};

async fn seed(store: &Store) -> (TaskSessionId, TurnId) {
    let session = TaskSessionBuilder::default().task_id(TaskId::new()).build();
    store.create_session(session.clone()).await.unwrap();
    let turn = store.open_turn(&session.id, &session.task_id, 1).await.unwrap();
    (session.id, turn.id)
}

fn message(session_id: TaskSessionId, turn_id: TurnId, content: &str, created_at_ms: u64) -> Message {
    Message {
        id: MessageId::new(),
        session_id,
        turn_id,
        author_type: AuthorType::Agent,
        kind: MessageKind::Message,
        content: content.to_string(),
        metadata: serde_json::Map::new(),
        requests_input: false,
        created_at_ms,
    }
}

#[tokio::test]
async fn append_message_requires_an_open_turn() {
    let store = Store::open_in_memory().unwrap();
    let (session_id, turn_id) = seed(&store).await;
    store.close_turn(&turn_id, serde_json::Map::new(), 99).await.unwrap();

    let err = store.append_message(message(session_id, turn_id, "too late", 100)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn append_message_rejects_mismatched_session() {
    let store = Store::open_in_memory().unwrap();
    let (_session_id, turn_id) = seed(&store).await;
    let other_session = TaskSessionId::new();

    let err = store.append_message(message(other_session, turn_id, "wrong session", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn list_messages_paginates_ascending_by_default() {
    let store = Store::open_in_memory().unwrap();
    let (session_id, turn_id) = seed(&store).await;
    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        store.append_message(message(session_id, turn_id, text, (i + 1) as u64)).await.unwrap();
    }

    let page = store.list_messages(&session_id, None, None, 10, SortOrder::Ascending).await.unwrap();
    assert_eq!(page.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn list_messages_after_cursor_excludes_seen_messages() {
    let store = Store::open_in_memory().unwrap();
    let (session_id, turn_id) = seed(&store).await;
    let first = message(session_id, turn_id, "one", 1);
    let first_id = first.id;
    store.append_message(first).await.unwrap();
    store.append_message(message(session_id, turn_id, "two", 2)).await.unwrap();
    store.append_message(message(session_id, turn_id, "three", 3)).await.unwrap();

    let page = store.list_messages(&session_id, None, Some(first_id), 10, SortOrder::Ascending).await.unwrap();
    assert_eq!(page.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(), vec!["two", "three"]);
}

#[tokio::test]
async fn list_messages_respects_limit() {
    let store = Store::open_in_memory().unwrap();
    let (session_id, turn_id) = seed(&store).await;
    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        store.append_message(message(session_id, turn_id, text, (i + 1) as u64)).await.unwrap();
    }

    let page = store.list_messages(&session_id, None, None, 2, SortOrder::Ascending).await.unwrap();
    assert_eq!(page.len(), 2);
}
