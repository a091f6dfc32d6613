// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and repository-binding persistence.

use crate::connection::Store;
use crate::error::{StoreError, StoreResult};
use kandev_core::{RepositoryBinding, Task, TaskId, TaskState, TaskSessionId, WorkflowId, WorkflowStepId};
use rusqlite::{params, Connection, OptionalExtension, Row};

impl Store {
    pub async fn create_task(&self, task: Task) -> StoreResult<()> {
        self.with_conn(move |conn| insert_task(conn, &task)).await
    }

    pub async fn get_task(&self, id: &TaskId) -> StoreResult<Task> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let task = load_task(conn, &id)?.ok_or_else(|| StoreError::NotFound {
                what: "task",
                id: id.to_string(),
            })?;
            Ok(task)
        })
        .await
    }

    pub async fn update_task(&self, task: Task) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE tasks SET workflow_id=?2, workflow_step_id=?3, title=?4, description=?5,
                 state=?6, updated_at=?7 WHERE id=?1 AND deleted_at IS NULL",
                params![
                    task.id.as_str(),
                    task.workflow_id.as_str(),
                    task.workflow_step_id.as_str(),
                    task.title,
                    task.description,
                    state_str(task.state),
                    task.updated_at_ms as i64,
                ],
            )?;
            tx.execute("DELETE FROM task_repositories WHERE task_id=?1", params![task.id.as_str()])?;
            for repo in &task.repositories {
                tx.execute(
                    "INSERT INTO task_repositories (task_id, repository_id, base_branch) VALUES (?1, ?2, ?3)",
                    params![task.id.as_str(), repo.repository_id, repo.base_branch],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn delete_task(&self, id: &TaskId, now_ms: u64) -> StoreResult<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET deleted_at=?2 WHERE id=?1",
                params![id.as_str(), now_ms as i64],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, workflow_id, workflow_step_id, title, description, state,
                 created_at, updated_at FROM tasks WHERE deleted_at IS NULL ORDER BY created_at ASC",
            )?;
            let ids: Vec<TaskId> = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(TaskId::from_string)
                .collect();
            drop(stmt);
            ids.into_iter()
                .map(|id| {
                    load_task(conn, &id)?.ok_or_else(|| StoreError::NotFound {
                        what: "task",
                        id: id.to_string(),
                    })
                })
                .collect()
        })
        .await
    }
}

fn insert_task(conn: &Connection, task: &Task) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO tasks (id, workflow_id, workflow_step_id, title, description, state,
         created_at, updated_at, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
        params![
            task.id.as_str(),
            task.workflow_id.as_str(),
            task.workflow_step_id.as_str(),
            task.title,
            task.description,
            state_str(task.state),
            task.created_at_ms as i64,
            task.updated_at_ms as i64,
        ],
    )?;
    for repo in &task.repositories {
        tx.execute(
            "INSERT INTO task_repositories (task_id, repository_id, base_branch) VALUES (?1, ?2, ?3)",
            params![task.id.as_str(), repo.repository_id, repo.base_branch],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn load_task(conn: &Connection, id: &TaskId) -> StoreResult<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT id, workflow_id, workflow_step_id, title, description, state,
             created_at, updated_at FROM tasks WHERE id=?1 AND deleted_at IS NULL",
            params![id.as_str()],
            row_to_task,
        )
        .optional()?;
    let Some(mut task) = task else { return Ok(None) };

    let mut stmt = conn.prepare("SELECT repository_id, base_branch FROM task_repositories WHERE task_id=?1")?;
    task.repositories = stmt
        .query_map(params![id.as_str()], |row| {
            Ok(RepositoryBinding { repository_id: row.get(0)?, base_branch: row.get(1)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let primary: Option<String> = conn
        .query_row(
            "SELECT id FROM task_sessions WHERE task_id=?1 AND is_primary=1 LIMIT 1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    task.primary_session_id = primary.map(TaskSessionId::from_string);

    Ok(Some(task))
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let state: String = row.get(5)?;
    Ok(Task {
        id: TaskId::from_string(row.get::<_, String>(0)?),
        workflow_id: WorkflowId::from_string(row.get::<_, String>(1)?),
        workflow_step_id: WorkflowStepId::from_string(row.get::<_, String>(2)?),
        title: row.get(3)?,
        description: row.get(4)?,
        state: parse_state(&state),
        repositories: Vec::new(),
        primary_session_id: None,
        created_at_ms: row.get::<_, i64>(6)? as u64,
        updated_at_ms: row.get::<_, i64>(7)? as u64,
    })
}

pub(crate) fn state_str(state: TaskState) -> &'static str {
    match state {
        TaskState::Created => "created",
        TaskState::Scheduling => "scheduling",
        TaskState::Todo => "todo",
        TaskState::InProgress => "in_progress",
        TaskState::Review => "review",
        TaskState::Blocked => "blocked",
        TaskState::WaitingForInput => "waiting_for_input",
        TaskState::Completed => "completed",
        TaskState::Failed => "failed",
        TaskState::Cancelled => "cancelled",
    }
}

fn parse_state(s: &str) -> TaskState {
    match s {
        "scheduling" => TaskState::Scheduling,
        "todo" => TaskState::Todo,
        "in_progress" => TaskState::InProgress,
        "review" => TaskState::Review,
        "blocked" => TaskState::Blocked,
        "waiting_for_input" => TaskState::WaitingForInput,
        "completed" => TaskState::Completed,
        "failed" => TaskState::Failed,
        "cancelled" => TaskState::Cancelled,
        _ => TaskState::Created,
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
