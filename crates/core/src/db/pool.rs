use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::{CoreError, ErrorKind};

#[derive(Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    pub async fn connect(url: &str, max_size: u32, timeout_seconds: u64) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_size)
            .acquire_timeout(Duration::from_secs(timeout_seconds))
            .connect(url)
            .await
            .map_err(|e| CoreError::new(ErrorKind::StorageError, e.to_string()))?;
        Ok(Self { pool })
    }

    /// Scoped acquisition: every call site gets the pool and returns the
    /// connection on drop; sqlx's pool
    /// already guarantees this, this wrapper exists only so repositories
    /// never hold a raw connection across an await boundary by accident.
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
