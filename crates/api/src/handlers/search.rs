//! Ad hoc retrieval endpoint: runs the hybrid retriever directly
//! against a tenant's documents or collection, without the chat/memory
//! machinery — useful for debugging retrieval quality.

use axum::extract::{Extension, Json, Query};
use docint_core::db::chunks::Scope;
use docint_core::db::documents::DocumentStore;
use docint_core::model::DocumentStatus;
use docint_core::retrieval;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::security::DocumentAuthorization;
use crate::services::hybrid_retriever::HybridRetriever;
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub tenant_id: Uuid,
    pub query: String,
    pub document_ids: Vec<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub text: String,
    pub hybrid_score: f32,
    pub page_number: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
}

pub async fn search_handler(
    Extension(retriever): Extension<Arc<HybridRetriever>>,
    Extension(doc_auth): Extension<Arc<DocumentAuthorization>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    info!(tenant_id = %request.tenant_id, query = %request.query, "search request");

    for document_id in &request.document_ids {
        doc_auth.require_access(request.tenant_id, *document_id).await?;
    }

    let limit = request.limit.unwrap_or(10).min(50);
    let (query_type, prefs) = retrieval::classify_query(&request.query, request.document_ids.len());
    let scope = Scope::Documents(request.document_ids.clone());

    let retrieved = retriever
        .retrieve(&request.query, &scope, query_type, &prefs, limit)
        .await?;

    let results: Vec<SearchResultItem> = retrieved
        .into_iter()
        .map(|r| SearchResultItem {
            chunk_id: r.chunk.id,
            document_id: r.chunk.document_id,
            text: r.chunk.text,
            hybrid_score: r.hybrid_score,
            page_number: r.chunk.page_number,
        })
        .collect();

    let total = results.len();
    Ok(Json(SearchResponse { results, total }))
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    pub tenant_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DocumentInfo {
    pub document_id: Uuid,
    pub filename: String,
    pub status: DocumentStatus,
    pub chunk_count: i32,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentInfo>,
    pub total: usize,
}

pub async fn list_documents_handler(
    Extension(documents): Extension<Arc<DocumentStore>>,
    Query(params): Query<ListDocumentsParams>,
) -> Result<Json<ListDocumentsResponse>, ApiError> {
    info!(tenant_id = %params.tenant_id, "list documents request");

    let docs = documents.list_by_tenant(params.tenant_id).await?;
    let documents: Vec<DocumentInfo> = docs
        .into_iter()
        .map(|doc| DocumentInfo {
            document_id: doc.id,
            filename: doc.filename,
            status: doc.status,
            chunk_count: doc.chunk_count,
            created_at: doc.created_at.to_rfc3339(),
        })
        .collect();
    let total = documents.len();

    Ok(Json(ListDocumentsResponse { documents, total }))
}
