//! Postgres-backed `Repository`, grounded on the per-column
//! `sqlx::query(..).bind(..).fetch_one(pool).await.map_err(..)` then
//! `row.try_get::<T>("col").map_err(..)` style of
//! `data_designer_core::runtime_orchestrator::load_template_dictionary`.
//! `CreateRun` inserts the run row and every child step row inside one
//! transaction (§4.10).

use crate::repository::{paginate, Repository};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;
use warden_core::{
    AgentId, RunId, RunStatus, StepId, StepRun, StepStatus, Result, WardenError, WorkflowDefinition,
    WorkflowId, WorkflowRun,
};

pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn definition_from_row(row: &sqlx::postgres::PgRow) -> Result<WorkflowDefinition> {
    let steps_json: serde_json::Value = row
        .try_get("steps")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let triggers_json: serde_json::Value = row
        .try_get("triggers")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let policies_json: serde_json::Value = row
        .try_get("policies")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let metadata_json: serde_json::Value = row
        .try_get("metadata")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let id_text: String = row.try_get("id").map_err(|e| WardenError::Internal(e.to_string()))?;

    Ok(WorkflowDefinition {
        id: WorkflowId::from_str(&id_text).map_err(|e| WardenError::Internal(e.to_string()))?,
        name: row.try_get("name").map_err(|e| WardenError::Internal(e.to_string()))?,
        version: row.try_get("version").map_err(|e| WardenError::Internal(e.to_string()))?,
        description: row
            .try_get("description")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        steps: serde_json::from_value(steps_json).map_err(|e| WardenError::Internal(e.to_string()))?,
        triggers: serde_json::from_value(triggers_json).map_err(|e| WardenError::Internal(e.to_string()))?,
        policies: serde_json::from_value(policies_json).map_err(|e| WardenError::Internal(e.to_string()))?,
        checksum: row.try_get("checksum").map_err(|e| WardenError::Internal(e.to_string()))?,
        metadata: serde_json::from_value(metadata_json).map_err(|e| WardenError::Internal(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
    })
}

fn step_from_row(row: &sqlx::postgres::PgRow) -> Result<StepRun> {
    let id_text: String = row.try_get("id").map_err(|e| WardenError::Internal(e.to_string()))?;
    let run_id_text: String = row.try_get("run_id").map_err(|e| WardenError::Internal(e.to_string()))?;
    let agent_id_text: String = row
        .try_get("agent_id")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let status_text: String = row.try_get("status").map_err(|e| WardenError::Internal(e.to_string()))?;
    let input_json: serde_json::Value = row
        .try_get("input")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let output_json: Option<serde_json::Value> = row
        .try_get("output")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let timeout_secs: i64 = row
        .try_get("timeout_secs")
        .map_err(|e| WardenError::Internal(e.to_string()))?;

    Ok(StepRun {
        id: StepId::from_str(&id_text).map_err(|e| WardenError::Internal(e.to_string()))?,
        run_id: RunId::from_str(&run_id_text).map_err(|e| WardenError::Internal(e.to_string()))?,
        index: row
            .try_get::<i32, _>("step_index")
            .map_err(|e| WardenError::Internal(e.to_string()))? as usize,
        name: row.try_get("name").map_err(|e| WardenError::Internal(e.to_string()))?,
        agent_id: AgentId::from_str(&agent_id_text).map_err(|e| WardenError::Internal(e.to_string()))?,
        status: status_from_str(&status_text)?,
        input: serde_json::from_value(input_json).map_err(|e| WardenError::Internal(e.to_string()))?,
        output: output_json,
        requires_approval: row
            .try_get("requires_approval")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        timeout: Duration::from_secs(timeout_secs.max(0) as u64),
        max_retries: row
            .try_get::<i32, _>("max_retries")
            .map_err(|e| WardenError::Internal(e.to_string()))? as u32,
        retry_count: row
            .try_get::<i32, _>("retry_count")
            .map_err(|e| WardenError::Internal(e.to_string()))? as u32,
        error: row.try_get("error").map_err(|e| WardenError::Internal(e.to_string()))?,
        tokens_in: row
            .try_get::<i64, _>("tokens_in")
            .map_err(|e| WardenError::Internal(e.to_string()))? as u64,
        tokens_out: row
            .try_get::<i64, _>("tokens_out")
            .map_err(|e| WardenError::Internal(e.to_string()))? as u64,
        started_at: row
            .try_get("started_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        completed_at: row
            .try_get("completed_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
    })
}

fn status_from_str(s: &str) -> Result<StepStatus> {
    match s {
        "pending" => Ok(StepStatus::Pending),
        "running" => Ok(StepStatus::Running),
        "completed" => Ok(StepStatus::Completed),
        "failed" => Ok(StepStatus::Failed),
        "skipped" => Ok(StepStatus::Skipped),
        other => Err(WardenError::Internal(format!("unknown step status '{other}'"))),
    }
}

fn run_status_from_str(s: &str) -> Result<RunStatus> {
    match s {
        "pending" => Ok(RunStatus::Pending),
        "policy_check" => Ok(RunStatus::PolicyCheck),
        "awaiting_approval" => Ok(RunStatus::AwaitingApproval),
        "executing" => Ok(RunStatus::Executing),
        "completed" => Ok(RunStatus::Completed),
        "failed" => Ok(RunStatus::Failed),
        "cancelled" => Ok(RunStatus::Cancelled),
        other => Err(WardenError::Internal(format!("unknown run status '{other}'"))),
    }
}

fn run_status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "pending",
        RunStatus::PolicyCheck => "policy_check",
        RunStatus::AwaitingApproval => "awaiting_approval",
        RunStatus::Executing => "executing",
        RunStatus::Completed => "completed",
        RunStatus::Failed => "failed",
        RunStatus::Cancelled => "cancelled",
    }
}

fn step_status_str(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "pending",
        StepStatus::Running => "running",
        StepStatus::Completed => "completed",
        StepStatus::Failed => "failed",
        StepStatus::Skipped => "skipped",
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_definition(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition> {
        let existing = sqlx::query("SELECT id FROM workflow_definitions WHERE name = $1")
            .bind(&definition.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?;
        if existing.is_some() {
            return Err(WardenError::WorkflowAlreadyExists(definition.name));
        }

        sqlx::query(
            r#"
            INSERT INTO workflow_definitions
                (id, name, version, description, steps, triggers, policies, checksum, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(definition.id.to_string())
        .bind(&definition.name)
        .bind(&definition.version)
        .bind(&definition.description)
        .bind(serde_json::to_value(&definition.steps).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(serde_json::to_value(&definition.triggers).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(serde_json::to_value(&definition.policies).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(&definition.checksum)
        .bind(serde_json::to_value(&definition.metadata).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(definition.created_at)
        .bind(definition.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

        Ok(definition)
    }

    async fn get(&self, id: WorkflowId) -> Result<WorkflowDefinition> {
        let row = sqlx::query("SELECT * FROM workflow_definitions WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?
            .ok_or_else(|| WardenError::WorkflowNotFound(id.to_string()))?;
        definition_from_row(&row)
    }

    async fn get_by_name(&self, name: &str) -> Result<WorkflowDefinition> {
        let row = sqlx::query("SELECT * FROM workflow_definitions WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?
            .ok_or_else(|| WardenError::WorkflowNotFound(name.to_string()))?;
        definition_from_row(&row)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<WorkflowDefinition>> {
        let rows = sqlx::query("SELECT * FROM workflow_definitions ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?;
        let defs = rows
            .iter()
            .map(definition_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(paginate(&defs, limit, offset))
    }

    async fn update(&self, definition: WorkflowDefinition) -> Result<WorkflowDefinition> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_definitions
            SET name = $2, version = $3, description = $4, steps = $5, triggers = $6,
                policies = $7, checksum = $8, metadata = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(definition.id.to_string())
        .bind(&definition.name)
        .bind(&definition.version)
        .bind(&definition.description)
        .bind(serde_json::to_value(&definition.steps).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(serde_json::to_value(&definition.triggers).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(serde_json::to_value(&definition.policies).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(&definition.checksum)
        .bind(serde_json::to_value(&definition.metadata).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(definition.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(WardenError::WorkflowNotFound(definition.id.to_string()));
        }
        Ok(definition)
    }

    async fn delete(&self, id: WorkflowId) -> Result<()> {
        let result = sqlx::query("DELETE FROM workflow_definitions WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(WardenError::WorkflowNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_run(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let mut tx = self.pool.begin().await.map_err(|e| WardenError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO workflow_runs
                (id, workflow_id, workflow_name, workflow_version, status, current_step_index,
                 context, triggered_by, trigger_data, error, started_at, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(run.id.to_string())
        .bind(run.workflow_id.to_string())
        .bind(&run.workflow_name)
        .bind(&run.workflow_version)
        .bind(run_status_str(run.status))
        .bind(run.current_step_index as i32)
        .bind(serde_json::to_value(&run.context).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(&run.triggered_by)
        .bind(&run.trigger_data)
        .bind(&run.error)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

        for step in &run.steps {
            insert_step(&mut tx, step).await?;
        }

        tx.commit().await.map_err(|e| WardenError::Internal(e.to_string()))?;
        Ok(run)
    }

    async fn get_run(&self, id: RunId) -> Result<WorkflowRun> {
        let run_row = sqlx::query("SELECT * FROM workflow_runs WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?
            .ok_or_else(|| WardenError::RunNotFound(id.to_string()))?;

        let step_rows = sqlx::query("SELECT * FROM step_runs WHERE run_id = $1 ORDER BY step_index ASC")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?;
        let steps = step_rows.iter().map(step_from_row).collect::<Result<Vec<_>>>()?;

        run_from_row(&run_row, steps)
    }

    async fn list_runs(&self, workflow_id: WorkflowId, limit: usize, offset: usize) -> Result<Vec<WorkflowRun>> {
        let run_rows = sqlx::query("SELECT * FROM workflow_runs WHERE workflow_id = $1 ORDER BY created_at ASC")
            .bind(workflow_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?;

        let mut runs = Vec::with_capacity(run_rows.len());
        for row in &run_rows {
            let run_id: String = row.try_get("id").map_err(|e| WardenError::Internal(e.to_string()))?;
            let step_rows = sqlx::query("SELECT * FROM step_runs WHERE run_id = $1 ORDER BY step_index ASC")
                .bind(&run_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| WardenError::Internal(e.to_string()))?;
            let steps = step_rows.iter().map(step_from_row).collect::<Result<Vec<_>>>()?;
            runs.push(run_from_row(row, steps)?);
        }
        Ok(paginate(&runs, limit, offset))
    }

    async fn list_active_runs(&self) -> Result<Vec<WorkflowRun>> {
        let run_rows = sqlx::query(
            "SELECT * FROM workflow_runs WHERE status NOT IN ('completed', 'failed', 'cancelled') ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

        let mut runs = Vec::with_capacity(run_rows.len());
        for row in &run_rows {
            let run_id: String = row.try_get("id").map_err(|e| WardenError::Internal(e.to_string()))?;
            let step_rows = sqlx::query("SELECT * FROM step_runs WHERE run_id = $1 ORDER BY step_index ASC")
                .bind(&run_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| WardenError::Internal(e.to_string()))?;
            let steps = step_rows.iter().map(step_from_row).collect::<Result<Vec<_>>>()?;
            runs.push(run_from_row(row, steps)?);
        }
        Ok(runs)
    }

    async fn update_run(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_runs
            SET status = $2, current_step_index = $3, context = $4, error = $5,
                started_at = $6, completed_at = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(run.id.to_string())
        .bind(run_status_str(run.status))
        .bind(run.current_step_index as i32)
        .bind(serde_json::to_value(&run.context).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(&run.error)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(run.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(WardenError::RunNotFound(run.id.to_string()));
        }
        Ok(run)
    }

    async fn get_step(&self, run_id: RunId, step_id: StepId) -> Result<StepRun> {
        let row = sqlx::query("SELECT * FROM step_runs WHERE run_id = $1 AND id = $2")
            .bind(run_id.to_string())
            .bind(step_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WardenError::Internal(e.to_string()))?
            .ok_or_else(|| WardenError::StepNotFound(step_id.to_string()))?;
        step_from_row(&row)
    }

    async fn update_step(&self, run_id: RunId, step: StepRun) -> Result<StepRun> {
        let result = sqlx::query(
            r#"
            UPDATE step_runs
            SET agent_id = $3, status = $4, input = $5, output = $6, retry_count = $7,
                error = $8, tokens_in = $9, tokens_out = $10, started_at = $11, completed_at = $12
            WHERE run_id = $1 AND id = $2
            "#,
        )
        .bind(run_id.to_string())
        .bind(step.id.to_string())
        .bind(step.agent_id.to_string())
        .bind(step_status_str(step.status))
        .bind(serde_json::to_value(&step.input).map_err(|e| WardenError::Internal(e.to_string()))?)
        .bind(&step.output)
        .bind(step.retry_count as i32)
        .bind(&step.error)
        .bind(step.tokens_in as i64)
        .bind(step.tokens_out as i64)
        .bind(step.started_at)
        .bind(step.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WardenError::Internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(WardenError::StepNotFound(step.id.to_string()));
        }
        Ok(step)
    }
}

async fn insert_step(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, step: &StepRun) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO step_runs
            (id, run_id, step_index, name, agent_id, status, input, output, requires_approval,
             timeout_secs, max_retries, retry_count, error, tokens_in, tokens_out, started_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(step.id.to_string())
    .bind(step.run_id.to_string())
    .bind(step.index as i32)
    .bind(&step.name)
    .bind(step.agent_id.to_string())
    .bind(step_status_str(step.status))
    .bind(serde_json::to_value(&step.input).map_err(|e| WardenError::Internal(e.to_string()))?)
    .bind(&step.output)
    .bind(step.requires_approval)
    .bind(step.timeout.as_secs() as i64)
    .bind(step.max_retries as i32)
    .bind(step.retry_count as i32)
    .bind(&step.error)
    .bind(step.tokens_in as i64)
    .bind(step.tokens_out as i64)
    .bind(step.started_at)
    .bind(step.completed_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| WardenError::Internal(e.to_string()))?;
    Ok(())
}

fn run_from_row(row: &sqlx::postgres::PgRow, steps: Vec<StepRun>) -> Result<WorkflowRun> {
    let id_text: String = row.try_get("id").map_err(|e| WardenError::Internal(e.to_string()))?;
    let workflow_id_text: String = row
        .try_get("workflow_id")
        .map_err(|e| WardenError::Internal(e.to_string()))?;
    let status_text: String = row.try_get("status").map_err(|e| WardenError::Internal(e.to_string()))?;
    let context_json: serde_json::Value = row
        .try_get("context")
        .map_err(|e| WardenError::Internal(e.to_string()))?;

    Ok(WorkflowRun {
        id: RunId::from_str(&id_text).map_err(|e| WardenError::Internal(e.to_string()))?,
        workflow_id: WorkflowId::from_str(&workflow_id_text).map_err(|e| WardenError::Internal(e.to_string()))?,
        workflow_name: row
            .try_get("workflow_name")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        workflow_version: row
            .try_get("workflow_version")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        status: run_status_from_str(&status_text)?,
        current_step_index: row
            .try_get::<i32, _>("current_step_index")
            .map_err(|e| WardenError::Internal(e.to_string()))? as usize,
        steps,
        context: serde_json::from_value(context_json).map_err(|e| WardenError::Internal(e.to_string()))?,
        triggered_by: row
            .try_get("triggered_by")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        trigger_data: row
            .try_get("trigger_data")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        error: row.try_get("error").map_err(|e| WardenError::Internal(e.to_string()))?,
        started_at: row
            .try_get("started_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        completed_at: row
            .try_get("completed_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| WardenError::Internal(e.to_string()))?,
    })
}
