// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn lifecycle. A turn is open the instant it's created and closes
//! exactly once; messages may only be appended while their turn is open
//! (enforced by [`crate::messages`], not here).

use crate::connection::{from_json, to_json, Store};
use crate::error::{StoreError, StoreResult};
use kandev_core::{TaskId, TaskSessionId, Turn, TurnId};
use rusqlite::{params, OptionalExtension};

impl Store {
    pub async fn open_turn(&self, session_id: &TaskSessionId, task_id: &TaskId, now_ms: u64) -> StoreResult<Turn> {
        let session_id = *session_id;
        let task_id = *task_id;
        self.with_conn(move |conn| {
            let turn = Turn {
                id: TurnId::new(),
                session_id,
                task_id,
                started_at_ms: now_ms,
                completed_at_ms: None,
                metadata: serde_json::Map::new(),
            };
            conn.execute(
                "INSERT INTO turns (id, session_id, task_id, started_at, completed_at, metadata)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                params![turn.id.as_str(), session_id.as_str(), task_id.as_str(), now_ms as i64, to_json(&turn.metadata)?],
            )?;
            Ok(turn)
        })
        .await
    }

    pub async fn close_turn(&self, id: &TurnId, metadata: serde_json::Map<String, serde_json::Value>, now_ms: u64) -> StoreResult<()> {
        let id = *id;
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE turns SET completed_at=?2, metadata=?3 WHERE id=?1",
                params![id.as_str(), now_ms as i64, to_json(&metadata)?],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { what: "turn", id: id.to_string() });
            }
            Ok(())
        })
        .await
    }

    pub async fn get_turn(&self, id: &TurnId) -> StoreResult<Turn> {
        let id = *id;
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT id, session_id, task_id, started_at, completed_at, metadata FROM turns WHERE id=?1",
                    params![id.as_str()],
                    row_to_turn,
                )
                .optional()?;
            match found {
                Some(turn) => turn,
                None => Err(StoreError::NotFound { what: "turn", id: id.to_string() }),
            }
        })
        .await
    }

    pub async fn list_turns(&self, session_id: &TaskSessionId) -> StoreResult<Vec<Turn>> {
        let session_id = *session_id;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, task_id, started_at, completed_at, metadata
                 FROM turns WHERE session_id=?1 ORDER BY started_at ASC",
            )?;
            let rows = stmt.query_map(params![session_id.as_str()], row_to_turn)?;
            rows.collect::<Result<Vec<_>, _>>()?.into_iter().collect()
        })
        .await
    }
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoreResult<Turn>> {
    let metadata_json: String = row.get(5)?;
    let build = || -> StoreResult<Turn> {
        Ok(Turn {
            id: TurnId::from_string(row.get::<_, String>(0)?),
            session_id: TaskSessionId::from_string(row.get::<_, String>(1)?),
            task_id: TaskId::from_string(row.get::<_, String>(2)?),
            started_at_ms: row.get::<_, i64>(3)? as u64,
            completed_at_ms: row.get::<_, Option<i64>>(4)?.map(|v| v as u64),
            metadata: from_json(&metadata_json)?,
        })
    };
    Ok(build())
}

#[cfg(test)]
#[path = "turns_tests.rs"]
mod tests;
