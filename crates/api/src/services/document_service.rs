//! Document ingestion orchestration: hashes the upload,
//! stores it, opens the document + job rows, and hands the job off to the
//! worker plane by leaving it `queued` in the Job Ledger. The API only does
//! bookkeeping here; the actual parsing/chunking/embedding runs in
//! `docint-worker`.

use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use docint_core::db::documents::DocumentStore;
use docint_core::db::jobs::JobStore;
use docint_core::error::CoreError;
use docint_core::model::{Document, Job, JobOwner, TenantId, UserId};
use docint_core::traits::StorageBackend;

pub struct DocumentService {
    documents: Arc<DocumentStore>,
    jobs: Arc<JobStore>,
    storage: Arc<dyn StorageBackend>,
}

pub struct IngestOutcome {
    pub document: Document,
    pub job: Option<Job>,
    pub deduplicated: bool,
}

impl DocumentService {
    pub fn new(documents: Arc<DocumentStore>, jobs: Arc<JobStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self { documents, jobs, storage }
    }

    /// Uploads `local_path`, content-hashes it, and opens a `Document` row.
    /// A hash collision within the tenant is a dedup hit, not an error
    /// — no job is queued for it.
    pub async fn ingest(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        filename: &str,
        local_path: &Path,
        size_bytes: i64,
    ) -> Result<IngestOutcome, CoreError> {
        let content_hash = hash_file(local_path).await?;

        if let Some(existing) = self.documents.get_by_hash(tenant_id, &content_hash).await? {
            return Ok(IngestOutcome { document: existing, job: None, deduplicated: true });
        }

        let storage_key = format!("{tenant_id}/{}-{filename}", Uuid::new_v4());
        let storage_path = self.storage.upload(local_path, &storage_key).await?;

        let (document, created) = self
            .documents
            .create(tenant_id, user_id, filename, &storage_path, size_bytes, &content_hash, None)
            .await?;

        if !created {
            return Ok(IngestOutcome { document, job: None, deduplicated: true });
        }

        let job = self.jobs.create(JobOwner::Document(document.id)).await?;
        Ok(IngestOutcome { document, job: Some(job), deduplicated: false })
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.documents.delete(id).await
    }
}

async fn hash_file(path: &Path) -> Result<String, CoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CoreError::new(docint_core::error::ErrorKind::StorageError, e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
