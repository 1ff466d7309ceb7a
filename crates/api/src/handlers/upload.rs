//! Document upload endpoint: stages the file to a temp path,
//! then hands off to `DocumentService` for hashing, storage, and Job Ledger
//! bookkeeping. Parsing/chunking/embedding happens in `docint-worker`.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub job_id: Option<Uuid>,
    pub deduplicated: bool,
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut tenant_id: Option<Uuid> = None;
    let mut user_id: Option<Uuid> = None;
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read field: {e}")))?
    {
        match field.name().unwrap_or("") {
            "tenant_id" => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                tenant_id = Some(text.parse().map_err(|_| ApiError::BadRequest("tenant_id must be a uuid".into()))?);
            }
            "user_id" => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                user_id = Some(text.parse().map_err(|_| ApiError::BadRequest("user_id must be a uuid".into()))?);
            }
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let tenant_id = tenant_id.ok_or_else(|| ApiError::BadRequest("tenant_id required".into()))?;
    let user_id = user_id.ok_or_else(|| ApiError::BadRequest("user_id required".into()))?;
    let file_data = file_data.ok_or_else(|| ApiError::BadRequest("file required".into()))?;
    let filename = filename.ok_or_else(|| ApiError::BadRequest("filename required".into()))?;
    let size_bytes = file_data.len() as i64;

    info!(%tenant_id, %user_id, %filename, size_bytes, "upload received");

    let tmp_path = std::env::temp_dir().join(format!("{}-{}", Uuid::new_v4(), &filename));
    tokio::fs::write(&tmp_path, &file_data)
        .await
        .map_err(|e| ApiError::InternalError(format!("failed to stage upload: {e}")))?;

    let outcome = state
        .document_service
        .ingest(tenant_id, user_id, &filename, &tmp_path, size_bytes)
        .await?;

    let _ = tokio::fs::remove_file(&tmp_path).await;

    Ok(Json(UploadResponse {
        document_id: outcome.document.id,
        job_id: outcome.job.map(|j| j.job_id),
        deduplicated: outcome.deduplicated,
    }))
}
