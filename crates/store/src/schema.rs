// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migrations. Base tables are created with `CREATE TABLE IF NOT
//! EXISTS`; column additions on existing installs are applied through an
//! idempotent "add column if missing" loop rather than a versioned
//! migration chain, since the schema only ever grows columns.

use crate::error::StoreResult;
use rusqlite::Connection;

const BASE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workflow_steps (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL REFERENCES workflows(id),
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    prompt TEXT NOT NULL,
    events TEXT NOT NULL,
    allow_manual_move INTEGER NOT NULL DEFAULT 1,
    auto_archive_after_hours INTEGER
);
CREATE INDEX IF NOT EXISTS idx_workflow_steps_workflow ON workflow_steps(workflow_id);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL,
    workflow_step_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    deleted_at INTEGER
);

CREATE TABLE IF NOT EXISTS task_repositories (
    task_id TEXT NOT NULL REFERENCES tasks(id),
    repository_id TEXT NOT NULL,
    base_branch TEXT NOT NULL,
    PRIMARY KEY (task_id, repository_id)
);

CREATE TABLE IF NOT EXISTS task_sessions (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL REFERENCES tasks(id),
    agent_execution_id TEXT,
    agent_profile_id TEXT NOT NULL,
    executor_id TEXT NOT NULL,
    environment_id TEXT NOT NULL,
    repository_id TEXT NOT NULL,
    base_branch TEXT NOT NULL,
    worktrees TEXT NOT NULL,
    state TEXT NOT NULL,
    workflow_step_id TEXT NOT NULL,
    review_status TEXT,
    is_primary INTEGER NOT NULL DEFAULT 0,
    is_passthrough INTEGER NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL,
    snapshot TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    completed_at INTEGER,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_task_sessions_task ON task_sessions(task_id);

CREATE TABLE IF NOT EXISTS turns (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES task_sessions(id),
    task_id TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    metadata TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES task_sessions(id),
    turn_id TEXT NOT NULL REFERENCES turns(id),
    author_type TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    requests_input INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_session_created ON messages(session_id, created_at, id);
"#;

/// Columns added after the base schema shipped. Each entry is applied only
/// if missing, so re-running this against an up-to-date database is a no-op.
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    // (table, column, full "ADD COLUMN" clause)
];

pub fn migrate(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(BASE_SCHEMA)?;
    for (table, column, clause) in ADDED_COLUMNS {
        if !column_exists(conn, table, column)? {
            conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {clause}"), [])?;
        }
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }

    #[test]
    fn creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master WHERE type='table' AND name='task_sessions'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
