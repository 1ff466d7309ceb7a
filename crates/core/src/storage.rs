//! Local-filesystem `StorageBackend`, shared by the request and
//! worker planes since both write into the same upload root. A single
//! vendor is enough for this deployment shape; swapping in an object-store
//! backend only requires a new impl of the same trait, not a call-site
//! rewrite.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, ErrorKind};
use crate::traits::StorageBackend;

pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, storage_key: &str) -> PathBuf {
        self.root.join(storage_key)
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, local_path: &Path, storage_key: &str) -> Result<String, CoreError> {
        let dest = self.resolve(storage_key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::new(ErrorKind::StorageError, e.to_string()))?;
        }
        tokio::fs::copy(local_path, &dest)
            .await
            .map_err(|e| CoreError::new(ErrorKind::StorageError, e.to_string()))?;
        Ok(storage_key.to_string())
    }

    async fn download(&self, storage_key: &str, local_path: &Path) -> Result<(), CoreError> {
        let src = self.resolve(storage_key);
        tokio::fs::copy(&src, local_path)
            .await
            .map_err(|e| CoreError::new(ErrorKind::StorageError, e.to_string()))?;
        Ok(())
    }

    async fn generate_presigned_url(&self, storage_key: &str, _ttl: Duration) -> Result<String, CoreError> {
        Ok(format!("file://{}", self.resolve(storage_key).display()))
    }

    async fn exists(&self, storage_key: &str) -> Result<bool, CoreError> {
        Ok(tokio::fs::try_exists(self.resolve(storage_key))
            .await
            .unwrap_or(false))
    }

    async fn delete(&self, storage_key: &str) -> Result<(), CoreError> {
        match tokio::fs::remove_file(self.resolve(storage_key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::new(ErrorKind::StorageError, e.to_string())),
        }
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
