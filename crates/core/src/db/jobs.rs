//! Job Ledger.

use sqlx::Row;
use uuid::Uuid;

use crate::db::pool::DbPool;
use crate::error::{CoreError, ErrorKind};
use crate::model::{Job, JobError, JobOwner, JobStatus};

pub struct JobStore {
    pool: DbPool,
}

fn owner_column(owner: &JobOwner) -> (&'static str, Uuid) {
    match owner {
        JobOwner::Extraction(id) => ("extraction_id", *id),
        JobOwner::Document(id) => ("document_id", *id),
        JobOwner::WorkflowRun(id) => ("workflow_run_id", *id),
        JobOwner::TemplateFillRun(id) => ("template_fill_run_id", *id),
    }
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::AwaitingReview => "awaiting_review",
    }
}

fn row_to_job(row: sqlx::postgres::PgRow) -> Result<Job, CoreError> {
    let owner = if let Ok(Some(id)) = row.try_get::<Option<Uuid>, _>("extraction_id") {
        JobOwner::Extraction(id)
    } else if let Ok(Some(id)) = row.try_get::<Option<Uuid>, _>("document_id") {
        JobOwner::Document(id)
    } else if let Ok(Some(id)) = row.try_get::<Option<Uuid>, _>("workflow_run_id") {
        JobOwner::WorkflowRun(id)
    } else if let Ok(Some(id)) = row.try_get::<Option<Uuid>, _>("template_fill_run_id") {
        JobOwner::TemplateFillRun(id)
    } else {
        return Err(CoreError::new(ErrorKind::StorageError, "job row has no owner set"));
    };

    let status_text: String = row.try_get("status").map_err(CoreError::from)?;
    let status = match status_text.as_str() {
        "queued" => JobStatus::Queued,
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "awaiting_review" => JobStatus::AwaitingReview,
        other => return Err(CoreError::new(ErrorKind::Validation, format!("unknown job status {other}"))),
    };

    let stage_flags_json: serde_json::Value = row.try_get("stage_flags").unwrap_or(serde_json::json!({}));
    let artifact_paths_json: serde_json::Value = row.try_get("artifact_paths").unwrap_or(serde_json::json!({}));
    let error_json: Option<serde_json::Value> = row.try_get("error").ok().flatten();

    Ok(Job {
        job_id: row.try_get("job_id").map_err(CoreError::from)?,
        owner,
        status,
        current_stage: row.try_get("current_stage").ok(),
        progress_percent: row.try_get("progress_percent").unwrap_or(0),
        message: row.try_get("message").ok(),
        details: row.try_get::<Option<serde_json::Value>, _>("details").ok().flatten(),
        stage_flags: serde_json::from_value(stage_flags_json).unwrap_or_default(),
        artifact_paths: serde_json::from_value(artifact_paths_json).unwrap_or_default(),
        error: error_json.and_then(|v| serde_json::from_value::<JobError>(v).ok()),
        created_at: row.try_get("created_at").map_err(CoreError::from)?,
        updated_at: row.try_get("updated_at").map_err(CoreError::from)?,
    })
}

impl JobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The closed `JobOwner` enum makes "exactly one owner" a construction
    /// invariant; this just picks which single column to populate.
    pub async fn create(&self, owner: JobOwner) -> Result<Job, CoreError> {
        let job = Job::new(owner);
        let (column, owner_id) = owner_column(&owner);
        let sql = format!(
            r#"INSERT INTO jobs
                (job_id, {column}, status, progress_percent, stage_flags, artifact_paths, created_at, updated_at)
               VALUES ($1, $2, 'queued', 0, '{{}}'::jsonb, '{{}}'::jsonb, $3, $3)"#
        );
        sqlx::query(&sql)
            .bind(job.job_id)
            .bind(owner_id)
            .bind(job.created_at)
            .execute(self.pool.get_pool())
            .await?;
        Ok(job)
    }

    /// Claims the oldest queued document-ingestion job for processing,
    /// using `FOR UPDATE SKIP LOCKED` so concurrent worker pollers never
    /// double-claim the same row.
    pub async fn claim_next_document_job(&self) -> Result<Option<Job>, CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;
        let row = sqlx::query(
            r#"SELECT * FROM jobs WHERE document_id IS NOT NULL AND status = 'queued'
               ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED"#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let job = row_to_job(row)?;

        sqlx::query("UPDATE jobs SET status = 'processing', updated_at = now() WHERE job_id = $1")
            .bind(job.job_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(job))
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Option<Job>, CoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(row_to_job).transpose()
    }

    pub async fn update_progress(
        &self,
        job_id: Uuid,
        stage: &str,
        progress_percent: i16,
        message: &str,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE jobs SET status = 'processing', current_stage = $2, progress_percent = $3,
                message = $4, updated_at = now() WHERE job_id = $1"#,
        )
        .bind(job_id)
        .bind(stage)
        .bind(progress_percent)
        .bind(message)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn mark_stage_completed(&self, job_id: Uuid, stage: &str, artifact_path: Option<&str>) -> Result<(), CoreError> {
        let flag_key = format!("{stage}_completed");
        sqlx::query(
            "UPDATE jobs SET stage_flags = stage_flags || jsonb_build_object($2::text, true), updated_at = now() WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(&flag_key)
        .execute(self.pool.get_pool())
        .await?;

        if let Some(path) = artifact_path {
            sqlx::query(
                "UPDATE jobs SET artifact_paths = artifact_paths || jsonb_build_object($2::text, $3::text), updated_at = now() WHERE job_id = $1",
            )
            .bind(job_id)
            .bind(stage)
            .bind(path)
            .execute(self.pool.get_pool())
            .await?;
        }
        Ok(())
    }

    pub async fn mark_completed(&self, job_id: Uuid) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', progress_percent = 100, updated_at = now() WHERE job_id = $1",
        )
        .bind(job_id)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, job_id: Uuid, error: JobError) -> Result<(), CoreError> {
        sqlx::query(
            "UPDATE jobs SET status = 'failed', error = $2, updated_at = now() WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(serde_json::to_value(&error).unwrap_or_default())
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    /// Resets a failed job to `queued` for retry. Stage flags and artifact
    /// paths are preserved so the worker resumes from the last durable
    /// artifact instead of re-running completed stages.
    pub async fn reset_for_retry(&self, job_id: Uuid) -> Result<Job, CoreError> {
        let job = self.get(job_id).await?.ok_or_else(|| CoreError::new(ErrorKind::NotFound, "job not found"))?;
        if job.status != JobStatus::Failed {
            return Err(CoreError::new(ErrorKind::Conflict, "only failed jobs can be retried"));
        }
        sqlx::query(
            "UPDATE jobs SET status = 'queued', error = NULL, updated_at = now() WHERE job_id = $1",
        )
        .bind(job_id)
        .execute(self.pool.get_pool())
        .await?;
        self.get(job_id).await?.ok_or_else(|| CoreError::new(ErrorKind::NotFound, "job not found"))
    }
}
