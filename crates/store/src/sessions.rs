// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: whole-row upserts plus the narrow atomic updates the
//! orchestrator needs on the hot path (state transitions, workflow step
//! moves, review status) without round-tripping the full row.

use crate::connection::{from_json, to_json, Store};
use crate::error::{StoreError, StoreResult};
use kandev_core::{AgentId, TaskId, TaskSession, TaskSessionId, TaskSessionStatus, WorkflowStepId, WorktreeBinding};
use rusqlite::{params, Connection, OptionalExtension, Row};

impl Store {
    pub async fn create_session(&self, session: TaskSession) -> StoreResult<()> {
        self.with_conn(move |conn| insert_session(conn, &session)).await
    }

    pub async fn get_session(&self, id: &TaskSessionId) -> StoreResult<TaskSession> {
        let id = *id;
        self.with_conn(move |conn| {
            load_session(conn, &id)?.ok_or_else(|| StoreError::NotFound { what: "session", id: id.to_string() })
        })
        .await
    }

    pub async fn get_by_session_execution_id(&self, agent_execution_id: &AgentId) -> StoreResult<Option<TaskSession>> {
        let agent_execution_id = agent_execution_id.clone();
        self.with_conn(move |conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM task_sessions WHERE agent_execution_id=?1",
                    params![agent_execution_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match id {
                Some(id) => load_session(conn, &TaskSessionId::from_string(id)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<TaskSession>> {
        let task_id = *task_id;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT id FROM task_sessions WHERE task_id=?1 ORDER BY started_at ASC")?;
            let ids: Vec<TaskSessionId> = stmt
                .query_map(params![task_id.as_str()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(TaskSessionId::from_string)
                .collect();
            drop(stmt);
            ids.into_iter()
                .map(|id| {
                    load_session(conn, &id)?.ok_or_else(|| StoreError::NotFound { what: "session", id: id.to_string() })
                })
                .collect()
        })
        .await
    }

    /// Whole-row replace. `metadata`/`snapshot`/`worktrees` are re-serialized
    /// in full; callers mutate the in-memory struct and write it back rather
    /// than patching individual JSON keys in SQL.
    pub async fn update_session(&self, session: TaskSession) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let metadata = to_json(&session.metadata)?;
            let snapshot = to_json(&session.snapshot)?;
            let worktrees = to_json(&session.worktrees)?;
            conn.execute(
                "UPDATE task_sessions SET agent_execution_id=?2, agent_profile_id=?3, executor_id=?4,
                 environment_id=?5, repository_id=?6, base_branch=?7, worktrees=?8, state=?9,
                 workflow_step_id=?10, review_status=?11, is_primary=?12, is_passthrough=?13,
                 metadata=?14, snapshot=?15, updated_at=?16, completed_at=?17, error_message=?18
                 WHERE id=?1",
                params![
                    session.id.as_str(),
                    session.agent_execution_id.as_ref().map(AgentId::as_str),
                    session.agent_profile_id,
                    session.executor_id,
                    session.environment_id,
                    session.repository_id,
                    session.base_branch,
                    worktrees,
                    status_str(session.state),
                    session.workflow_step_id.as_str(),
                    session.review_status,
                    session.is_primary as i64,
                    session.is_passthrough as i64,
                    metadata,
                    snapshot,
                    session.updated_at_ms as i64,
                    session.completed_at_ms.map(|v| v as i64),
                    session.error_message,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Atomic state transition. Sets `completed_at` the moment the new state
    /// is terminal, never earlier, so a row's completion timestamp always
    /// reflects the transition that actually ended it.
    pub async fn update_session_state(
        &self,
        id: &TaskSessionId,
        state: TaskSessionStatus,
        error_message: Option<String>,
        now_ms: u64,
    ) -> StoreResult<()> {
        let id = *id;
        self.with_conn(move |conn| {
            let completed_at = if state.is_terminal() { Some(now_ms as i64) } else { None };
            let changed = conn.execute(
                "UPDATE task_sessions SET state=?2, error_message=?3, updated_at=?4,
                 completed_at=COALESCE(completed_at, ?5) WHERE id=?1",
                params![id.as_str(), status_str(state), error_message, now_ms as i64, completed_at],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { what: "session", id: id.to_string() });
            }
            Ok(())
        })
        .await
    }

    pub async fn update_session_workflow_step(&self, id: &TaskSessionId, step_id: &WorkflowStepId, now_ms: u64) -> StoreResult<()> {
        let id = *id;
        let step_id = *step_id;
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE task_sessions SET workflow_step_id=?2, updated_at=?3 WHERE id=?1",
                params![id.as_str(), step_id.as_str(), now_ms as i64],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { what: "session", id: id.to_string() });
            }
            Ok(())
        })
        .await
    }

    pub async fn update_session_review_status(&self, id: &TaskSessionId, review_status: Option<String>, now_ms: u64) -> StoreResult<()> {
        let id = *id;
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE task_sessions SET review_status=?2, updated_at=?3 WHERE id=?1",
                params![id.as_str(), review_status, now_ms as i64],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound { what: "session", id: id.to_string() });
            }
            Ok(())
        })
        .await
    }
}

fn insert_session(conn: &Connection, session: &TaskSession) -> StoreResult<()> {
    let metadata = to_json(&session.metadata)?;
    let snapshot = to_json(&session.snapshot)?;
    let worktrees = to_json(&session.worktrees)?;
    conn.execute(
        "INSERT INTO task_sessions (id, task_id, agent_execution_id, agent_profile_id, executor_id,
         environment_id, repository_id, base_branch, worktrees, state, workflow_step_id,
         review_status, is_primary, is_passthrough, metadata, snapshot, started_at, updated_at,
         completed_at, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            session.id.as_str(),
            session.task_id.as_str(),
            session.agent_execution_id.as_ref().map(AgentId::as_str),
            session.agent_profile_id,
            session.executor_id,
            session.environment_id,
            session.repository_id,
            session.base_branch,
            worktrees,
            status_str(session.state),
            session.workflow_step_id.as_str(),
            session.review_status,
            session.is_primary as i64,
            session.is_passthrough as i64,
            metadata,
            snapshot,
            session.started_at_ms as i64,
            session.updated_at_ms as i64,
            session.completed_at_ms.map(|v| v as i64),
            session.error_message,
        ],
    )?;
    Ok(())
}

fn load_session(conn: &Connection, id: &TaskSessionId) -> StoreResult<Option<TaskSession>> {
    conn.query_row(
        "SELECT id, task_id, agent_execution_id, agent_profile_id, executor_id, environment_id,
         repository_id, base_branch, worktrees, state, workflow_step_id, review_status, is_primary,
         is_passthrough, metadata, snapshot, started_at, updated_at, completed_at, error_message
         FROM task_sessions WHERE id=?1",
        params![id.as_str()],
        row_to_session,
    )
    .optional()
    .map_err(StoreError::from)?
    .transpose()
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<StoreResult<TaskSession>> {
    let worktrees_json: String = row.get(8)?;
    let state: String = row.get(9)?;
    let metadata_json: String = row.get(14)?;
    let snapshot_json: String = row.get(15)?;

    let build = || -> StoreResult<TaskSession> {
        Ok(TaskSession {
            id: TaskSessionId::from_string(row.get::<_, String>(0)?),
            task_id: TaskId::from_string(row.get::<_, String>(1)?),
            agent_execution_id: row.get::<_, Option<String>>(2)?.map(AgentId::new),
            agent_profile_id: row.get(3)?,
            executor_id: row.get(4)?,
            environment_id: row.get(5)?,
            repository_id: row.get(6)?,
            base_branch: row.get(7)?,
            worktrees: from_json::<Vec<WorktreeBinding>>(&worktrees_json)?,
            state: parse_status(&state),
            workflow_step_id: WorkflowStepId::from_string(row.get::<_, String>(10)?),
            review_status: row.get(11)?,
            is_primary: row.get::<_, i64>(12)? != 0,
            is_passthrough: row.get::<_, i64>(13)? != 0,
            metadata: from_json(&metadata_json)?,
            snapshot: from_json(&snapshot_json)?,
            started_at_ms: row.get::<_, i64>(16)? as u64,
            updated_at_ms: row.get::<_, i64>(17)? as u64,
            completed_at_ms: row.get::<_, Option<i64>>(18)?.map(|v| v as u64),
            error_message: row.get(19)?,
        })
    };
    Ok(build())
}

fn status_str(state: TaskSessionStatus) -> &'static str {
    match state {
        TaskSessionStatus::Created => "created",
        TaskSessionStatus::Starting => "starting",
        TaskSessionStatus::Running => "running",
        TaskSessionStatus::WaitingForInput => "waiting_for_input",
        TaskSessionStatus::Completed => "completed",
        TaskSessionStatus::Failed => "failed",
        TaskSessionStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> TaskSessionStatus {
    match s {
        "starting" => TaskSessionStatus::Starting,
        "running" => TaskSessionStatus::Running,
        "waiting_for_input" => TaskSessionStatus::WaitingForInput,
        "completed" => TaskSessionStatus::Completed,
        "failed" => TaskSessionStatus::Failed,
        "cancelled" => TaskSessionStatus::Cancelled,
        _ => TaskSessionStatus::Created,
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
