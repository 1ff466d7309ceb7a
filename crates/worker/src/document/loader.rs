//! Stages a document's bytes from the shared `StorageBackend` onto local
//! disk so the parser registry (which needs a real path for `lopdf`/
//! `calamine`/`zip`) can read it.

use docint_core::traits::StorageBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::utils::error::WorkerError;

pub struct DocumentLoader {
    storage: Arc<dyn StorageBackend>,
    staging_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(storage: Arc<dyn StorageBackend>, staging_dir: impl Into<PathBuf>) -> Self {
        Self { storage, staging_dir: staging_dir.into() }
    }

    pub async fn stage(&self, storage_key: &str, filename: &str) -> Result<PathBuf, WorkerError> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let local_path = self.staging_dir.join(filename);
        self.storage.download(storage_key, &local_path).await?;
        Ok(local_path)
    }

    pub async fn cleanup(&self, local_path: &Path) {
        let _ = tokio::fs::remove_file(local_path).await;
    }
}
