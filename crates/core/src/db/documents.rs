//! Document Store.

use sqlx::Row;
use uuid::Uuid;

use crate::db::pool::DbPool;
use crate::error::{CoreError, ErrorKind};
use crate::model::{Document, DocumentStatus, TenantId, UserId};

pub struct DocumentStore {
    pool: DbPool,
}

impl DocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Document>, CoreError> {
        let doc = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(doc)
    }

    pub async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Document>, CoreError> {
        let rows = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE tenant_id = $1 ORDER BY created_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(self.pool.get_pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_by_hash(&self, tenant_id: TenantId, content_hash: &str) -> Result<Option<Document>, CoreError> {
        let doc = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE tenant_id = $1 AND content_hash = $2",
        )
        .bind(tenant_id)
        .bind(content_hash)
        .fetch_optional(self.pool.get_pool())
        .await?;
        Ok(doc)
    }

    /// On hash conflict, returns the existing row (read-after-conflict);
    /// never inserts a duplicate per tenant.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        filename: &str,
        file_path: &str,
        size_bytes: i64,
        content_hash: &str,
        page_count: Option<i32>,
    ) -> Result<(Document, bool), CoreError> {
        if let Some(existing) = self.get_by_hash(tenant_id, content_hash).await? {
            return Ok((existing, false));
        }

        let doc = sqlx::query_as::<_, Document>(
            r#"INSERT INTO documents
                (id, tenant_id, user_id, filename, file_path, size_bytes, content_hash,
                 page_count, chunk_count, status, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 'processing', now(), now())
               ON CONFLICT (tenant_id, content_hash) DO UPDATE SET updated_at = documents.updated_at
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(user_id)
        .bind(filename)
        .bind(file_path)
        .bind(size_bytes)
        .bind(content_hash)
        .bind(page_count)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok((doc, true))
    }

    pub async fn mark_completed(
        &self,
        id: Uuid,
        chunk_count: i32,
        pages: Option<i32>,
        processing_time_ms: i64,
        parser_used: &str,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"UPDATE documents SET
                status = 'completed', chunk_count = $2, page_count = COALESCE($3, page_count),
                processing_time_ms = $4, parser_used = $5, updated_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(chunk_count)
        .bind(pages)
        .bind(processing_time_ms)
        .bind(parser_used)
        .execute(self.pool.get_pool())
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), CoreError> {
        let truncated: String = message.chars().take(2000).collect();
        sqlx::query("UPDATE documents SET status = 'failed', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;
        tracing::warn!(document_id = %id, error = %truncated, "document marked failed");
        Ok(())
    }

    /// Cascading for chunks/membership/jobs; nulling for Extractions and
    /// WorkflowRuns. Run inside one
    /// transaction so the asymmetry is atomic.
    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool.get_pool().begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM collection_documents WHERE document_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM session_documents WHERE document_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM jobs WHERE document_id = $1").bind(id).execute(&mut *tx).await?;

        sqlx::query("UPDATE extractions SET document_id = NULL WHERE document_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query(
            "UPDATE workflow_runs SET document_ids = document_ids - $2::text WHERE document_ids ? $2::text",
        )
        .bind(id)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .ok();

        sqlx::query("DELETE FROM documents WHERE id = $1").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    pub fn status_from_row(row: &sqlx::postgres::PgRow) -> Result<DocumentStatus, CoreError> {
        let s: String = row.try_get("status").map_err(CoreError::from)?;
        match s.as_str() {
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(CoreError::new(ErrorKind::Validation, format!("unknown status {other}"))),
        }
    }
}
