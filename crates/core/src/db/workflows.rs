//! Workflow definitions & runs.

use uuid::Uuid;

use crate::db::pool::DbPool;
use crate::error::CoreError;
use crate::model::{JobStatus, Workflow, WorkflowMode, WorkflowRun};

pub struct WorkflowStore {
    pool: DbPool,
}

impl WorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_definition(&self, id: Uuid) -> Result<Option<Workflow>, CoreError> {
        let row = sqlx::query_as::<_, Workflow>("SELECT * FROM workflows WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(row)
    }

    pub async fn list_definitions(&self, category: Option<&str>) -> Result<Vec<Workflow>, CoreError> {
        let rows = match category {
            Some(cat) => {
                sqlx::query_as::<_, Workflow>("SELECT * FROM workflows WHERE category = $1 ORDER BY name")
                    .bind(cat)
                    .fetch_all(self.pool.get_pool())
                    .await?
            }
            None => {
                sqlx::query_as::<_, Workflow>("SELECT * FROM workflows ORDER BY name")
                    .fetch_all(self.pool.get_pool())
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn create_run(
        &self,
        workflow_id: Uuid,
        tenant_id: Uuid,
        user_id: Uuid,
        document_ids: &[Uuid],
        variables: serde_json::Value,
        mode: WorkflowMode,
    ) -> Result<WorkflowRun, CoreError> {
        let mode_str = match mode {
            WorkflowMode::Direct => "direct",
            WorkflowMode::MapReduce => "map_reduce",
        };
        let run = sqlx::query_as::<_, WorkflowRun>(
            r#"INSERT INTO workflow_runs
                (id, workflow_id, tenant_id, user_id, document_ids, variables, mode, status,
                 citations_count, validation_errors)
               VALUES ($1, $2, $3, $4, $5, $6, $7, 'queued', 0, '[]'::jsonb)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(workflow_id)
        .bind(tenant_id)
        .bind(user_id)
        .bind(serde_json::to_value(document_ids).unwrap_or_default())
        .bind(variables)
        .bind(mode_str)
        .fetch_one(self.pool.get_pool())
        .await?;
        Ok(run)
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Option<WorkflowRun>, CoreError> {
        let row = sqlx::query_as::<_, WorkflowRun>("SELECT * FROM workflow_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(row)
    }

    pub async fn complete_run(
        &self,
        id: Uuid,
        artifact: serde_json::Value,
        section_summaries: Option<serde_json::Value>,
        token_usage: i32,
        cost: f64,
        citations_count: i32,
        validation_errors: &[String],
        context_stats: Option<serde_json::Value>,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE workflow_runs SET
                status = 'completed', artifact = $2, section_summaries = $3, token_usage = $4,
                cost = $5, citations_count = $6, validation_errors = $7, context_stats = $8
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(artifact)
        .bind(section_summaries)
        .bind(token_usage)
        .bind(cost)
        .bind(citations_count)
        .bind(serde_json::to_value(validation_errors).unwrap_or_default())
        .bind(context_stats)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid) -> Result<(), CoreError> {
        sqlx::query("UPDATE workflow_runs SET status = 'failed' WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    pub async fn set_status(&self, id: Uuid, status: JobStatus) -> Result<(), CoreError> {
        let status_str = match status {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::AwaitingReview => "awaiting_review",
        };
        sqlx::query("UPDATE workflow_runs SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status_str)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}
