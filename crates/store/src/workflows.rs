// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow and workflow-step persistence. A workflow is small, user-authored
//! configuration data; reads and writes always move the whole aggregate
//! rather than individual steps.

use crate::connection::{from_json, to_json, Store};
use crate::error::{StoreError, StoreResult};
use kandev_core::{StepEvents, Workflow, WorkflowId, WorkflowStep, WorkflowStepId};
use rusqlite::{params, Connection, OptionalExtension};

impl Store {
    pub async fn create_workflow(&self, workflow: Workflow) -> StoreResult<()> {
        self.with_conn(move |conn| write_workflow(conn, &workflow, true)).await
    }

    pub async fn update_workflow(&self, workflow: Workflow) -> StoreResult<()> {
        self.with_conn(move |conn| write_workflow(conn, &workflow, false)).await
    }

    pub async fn get_workflow(&self, id: &WorkflowId) -> StoreResult<Workflow> {
        let id = *id;
        self.with_conn(move |conn| {
            load_workflow(conn, &id)?.ok_or_else(|| StoreError::NotFound { what: "workflow", id: id.to_string() })
        })
        .await
    }

    pub async fn list_workflows(&self) -> StoreResult<Vec<Workflow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM workflows ORDER BY id ASC")?;
            let ids: Vec<WorkflowId> = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(WorkflowId::from_string)
                .collect();
            drop(stmt);
            ids.into_iter()
                .map(|id| {
                    load_workflow(conn, &id)?.ok_or_else(|| StoreError::NotFound { what: "workflow", id: id.to_string() })
                })
                .collect()
        })
        .await
    }
}

fn write_workflow(conn: &Connection, workflow: &Workflow, insert: bool) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    if insert {
        tx.execute(
            "INSERT INTO workflows (id, name) VALUES (?1, ?2)",
            params![workflow.id.as_str(), workflow.name],
        )?;
    } else {
        tx.execute("UPDATE workflows SET name=?2 WHERE id=?1", params![workflow.id.as_str(), workflow.name])?;
    }

    tx.execute("DELETE FROM workflow_steps WHERE workflow_id=?1", params![workflow.id.as_str()])?;
    for step in &workflow.steps {
        tx.execute(
            "INSERT INTO workflow_steps (id, workflow_id, position, name, color, prompt, events,
             allow_manual_move, auto_archive_after_hours)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                step.id.as_str(),
                workflow.id.as_str(),
                step.position,
                step.name,
                step.color,
                step.prompt,
                to_json(&step.events)?,
                step.allow_manual_move as i64,
                step.auto_archive_after_hours,
            ],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn load_workflow(conn: &Connection, id: &WorkflowId) -> StoreResult<Option<Workflow>> {
    let name: Option<String> =
        conn.query_row("SELECT name FROM workflows WHERE id=?1", params![id.as_str()], |row| row.get(0)).optional()?;
    let Some(name) = name else { return Ok(None) };

    let mut stmt = conn.prepare(
        "SELECT id, position, name, color, prompt, events, allow_manual_move, auto_archive_after_hours
         FROM workflow_steps WHERE workflow_id=?1",
    )?;
    type StepRow = (String, i64, String, String, String, String, i64, Option<i64>);
    let rows: Vec<StepRow> = stmt
        .query_map(params![id.as_str()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let steps = rows
        .into_iter()
        .map(|(step_id, position, name, color, prompt, events_json, allow_manual_move, auto_archive)| {
            let events: StepEvents = from_json(&events_json)?;
            Ok(WorkflowStep {
                id: WorkflowStepId::from_string(step_id),
                workflow_id: *id,
                position,
                name,
                color,
                prompt,
                events,
                allow_manual_move: allow_manual_move != 0,
                auto_archive_after_hours: auto_archive.map(|v| v as u32),
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Some(Workflow { id: *id, name, steps }))
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
