//! Workflow + comparison endpoints.

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use docint_core::model::WorkflowRun;
use serde_json::Value;

use crate::state::AppState;
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RunWorkflowRequest {
    pub workflow_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub document_ids: Vec<Uuid>,
    #[serde(default)]
    pub variables: Value,
}

pub async fn run_workflow_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunWorkflowRequest>,
) -> Result<Json<WorkflowRun>, ApiError> {
    info!(workflow_id = %req.workflow_id, document_count = req.document_ids.len(), "workflow run request");

    let workflow = state
        .workflows
        .get_definition(req.workflow_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("workflow {} not found", req.workflow_id)))?;

    let run = state
        .workflow_engine
        .run(&workflow, req.tenant_id, req.user_id, &req.document_ids, req.variables)
        .await?;

    Ok(Json(run))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub query: String,
    pub document_ids: Vec<Uuid>,
    #[serde(default = "default_compare_k")]
    pub k: usize,
}

fn default_compare_k() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub result: Value,
}

pub async fn compare_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
    info!(query = %req.query, document_count = req.document_ids.len(), "comparison request");
    let result = state
        .comparison_engine
        .compare(&req.query, &req.document_ids, req.k)
        .await?;
    Ok(Json(CompareResponse { result }))
}
