// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only message transcript, paginated by a stable `(created_at, id)`
//! cursor so concurrent appends never shift a page the client already saw.

use crate::connection::{from_json, to_json, Store};
use crate::error::{StoreError, StoreResult};
use kandev_core::{AuthorType, Message, MessageId, MessageKind, TaskSessionId, TurnId};
use rusqlite::OptionalExtension;

/// Sort order for [`Store::list_messages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl Store {
    /// Appends `message` to its turn. Fails if the turn is not open or
    /// belongs to a different session, since a closed turn's transcript is
    /// immutable once the turn completes.
    pub async fn append_message(&self, message: Message) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let open: Option<String> = conn
                .query_row(
                    "SELECT session_id FROM turns WHERE id=?1 AND completed_at IS NULL",
                    rusqlite::params![message.turn_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match open {
                Some(session_id) if session_id == message.session_id.as_str() => {}
                Some(_) => {
                    return Err(StoreError::Conflict(format!(
                        "turn {} belongs to a different session",
                        message.turn_id
                    )))
                }
                None => {
                    return Err(StoreError::Conflict(format!("turn {} is not open", message.turn_id)));
                }
            }

            conn.execute(
                "INSERT INTO messages (id, session_id, turn_id, author_type, kind, content, metadata,
                 requests_input, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    message.id.as_str(),
                    message.session_id.as_str(),
                    message.turn_id.as_str(),
                    author_str(message.author_type),
                    kind_str(message.kind),
                    message.content,
                    to_json(&message.metadata)?,
                    message.requests_input as i64,
                    message.created_at_ms as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Cursor-paginated transcript read. `before`/`after` are message ids
    /// exclusive of the boundary; at most `limit` rows are returned.
    pub async fn list_messages(
        &self,
        session_id: &TaskSessionId,
        before: Option<MessageId>,
        after: Option<MessageId>,
        limit: u32,
        sort: SortOrder,
    ) -> StoreResult<Vec<Message>> {
        let session_id = *session_id;
        self.with_conn(move |conn| {
            let mut sql = String::from(
                "SELECT id, session_id, turn_id, author_type, kind, content, metadata, requests_input, created_at
                 FROM messages WHERE session_id = ?",
            );
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(session_id.as_str().to_string())];

            if let Some(id) = &before {
                let (ts, cursor_id) = cursor_timestamp(conn, id)?
                    .ok_or_else(|| StoreError::NotFound { what: "message", id: id.to_string() })?;
                sql.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
                params.push(Box::new(ts));
                params.push(Box::new(ts));
                params.push(Box::new(cursor_id));
            } else if let Some(id) = &after {
                let (ts, cursor_id) = cursor_timestamp(conn, id)?
                    .ok_or_else(|| StoreError::NotFound { what: "message", id: id.to_string() })?;
                sql.push_str(" AND (created_at > ? OR (created_at = ? AND id > ?))");
                params.push(Box::new(ts));
                params.push(Box::new(ts));
                params.push(Box::new(cursor_id));
            }

            sql.push_str(match sort {
                SortOrder::Ascending => " ORDER BY created_at ASC, id ASC",
                SortOrder::Descending => " ORDER BY created_at DESC, id DESC",
            });
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));

            let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(refs.as_slice(), row_to_message)?;
            rows.collect::<Result<Vec<_>, _>>()?.into_iter().collect()
        })
        .await
    }
}

fn cursor_timestamp(conn: &rusqlite::Connection, id: &MessageId) -> StoreResult<Option<(i64, String)>> {
    let row: Option<(i64, String)> = conn
        .query_row("SELECT created_at, id FROM messages WHERE id=?1", rusqlite::params![id.as_str()], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .optional()?;
    Ok(row)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoreResult<Message>> {
    let author: String = row.get(3)?;
    let kind: String = row.get(4)?;
    let metadata_json: String = row.get(6)?;
    let build = || -> StoreResult<Message> {
        Ok(Message {
            id: MessageId::from_string(row.get::<_, String>(0)?),
            session_id: TaskSessionId::from_string(row.get::<_, String>(1)?),
            turn_id: TurnId::from_string(row.get::<_, String>(2)?),
            author_type: parse_author(&author),
            kind: parse_kind(&kind),
            content: row.get(5)?,
            metadata: from_json(&metadata_json)?,
            requests_input: row.get::<_, i64>(7)? != 0,
            created_at_ms: row.get::<_, i64>(8)? as u64,
        })
    };
    Ok(build())
}

fn author_str(author: AuthorType) -> &'static str {
    match author {
        AuthorType::User => "user",
        AuthorType::Agent => "agent",
    }
}

fn parse_author(s: &str) -> AuthorType {
    match s {
        "agent" => AuthorType::Agent,
        _ => AuthorType::User,
    }
}

fn kind_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Message => "message",
        MessageKind::Content => "content",
        MessageKind::ToolCall => "tool_call",
        MessageKind::Progress => "progress",
        MessageKind::Error => "error",
        MessageKind::Status => "status",
        MessageKind::PermissionRequest => "permission_request",
    }
}

fn parse_kind(s: &str) -> MessageKind {
    match s {
        "content" => MessageKind::Content,
        "tool_call" => MessageKind::ToolCall,
        "progress" => MessageKind::Progress,
        "error" => MessageKind::Error,
        "status" => MessageKind::Status,
        "permission_request" => MessageKind::PermissionRequest,
        _ => MessageKind::Message,
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
