//! Entity types for the document intelligence backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TenantId = Uuid;
pub type UserId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub filename: String,
    pub file_path: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub page_count: Option<i32>,
    pub chunk_count: i32,
    pub status: DocumentStatus,
    pub parser_used: Option<String>,
    pub processing_time_ms: Option<i64>,
    pub cost: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Narrative,
    Table,
}

/// Relationship metadata carried on every chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub section_id: Option<String>,
    pub parent_chunk_id: Option<Uuid>,
    #[serde(default)]
    pub sibling_chunk_ids: Vec<Uuid>,
    pub linked_narrative_id: Option<Uuid>,
    #[serde(default)]
    pub linked_table_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_continuation: bool,
    pub chunk_sequence: Option<u32>,
    pub total_chunks_in_section: Option<u32>,
    #[serde(default)]
    pub heading_hierarchy: Vec<String>,
    #[serde(default)]
    pub paragraph_roles: Vec<String>,
    pub table_caption: Option<String>,
    pub table_context: Option<String>,
    pub table_row_count: Option<u32>,
    pub table_column_count: Option<u32>,
    pub content_type: Option<String>,
    /// Materialized at write time; always present on a normalized chunk.
    pub document_filename: Option<String>,
    pub first_sentence: Option<String>,
    pub content_summary: Option<String>,
    pub bbox: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: i32,
    pub text: String,
    pub narrative_text: String,
    /// Raw table rows/cols for table chunks; empty for narrative chunks.
    pub tables: Vec<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<String>,
    pub page_number: Option<i32>,
    pub page_range: Option<(i32, i32)>,
    pub section_type: SectionType,
    pub section_heading: Option<String>,
    pub is_tabular: bool,
    pub token_count: i32,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// After normalization, `document_filename` is always present,
    /// filled from `document_id` if the parser didn't materialize it.
    pub fn normalize(mut self, fallback_filename: &str) -> Self {
        if self.metadata.document_filename.is_none() {
            self.metadata.document_filename = Some(fallback_filename.to_string());
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub name: String,
    pub document_count: i64,
    pub total_chunks: i64,
    pub embedding_model: Option<String>,
    pub embedding_dimension: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDocument {
    pub collection_id: Uuid,
    pub document_id: Uuid,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub title: String,
    pub message_count: i32,
    pub last_summary_text: Option<String>,
    #[sqlx(json)]
    pub last_summary_key_facts: Vec<String>,
    pub last_summarized_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub session_id: Uuid,
    pub document_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub message_index: i32,
    #[sqlx(json)]
    pub source_chunk_ids: Vec<Uuid>,
    pub retrieval_query: Option<String>,
    pub num_chunks_retrieved: i32,
    pub model: Option<String>,
    pub tokens: Option<i32>,
    pub cost: Option<f64>,
    #[sqlx(json)]
    pub comparison_metadata: Option<serde_json::Value>,
    #[sqlx(json)]
    pub citation_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    AwaitingReview,
}

/// The exactly-one-owner invariant expressed as a closed enum
/// instead of four nullable columns plus a hand-checked constraint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum JobOwner {
    Extraction(Uuid),
    Document(Uuid),
    WorkflowRun(Uuid),
    TemplateFillRun(Uuid),
}

impl JobOwner {
    pub fn extraction_id(&self) -> Option<Uuid> {
        match self {
            JobOwner::Extraction(id) => Some(*id),
            _ => None,
        }
    }
    pub fn document_id(&self) -> Option<Uuid> {
        match self {
            JobOwner::Document(id) => Some(*id),
            _ => None,
        }
    }
    pub fn workflow_run_id(&self) -> Option<Uuid> {
        match self {
            JobOwner::WorkflowRun(id) => Some(*id),
            _ => None,
        }
    }
    pub fn template_fill_run_id(&self) -> Option<Uuid> {
        match self {
            JobOwner::TemplateFillRun(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub stage: String,
    pub message: String,
    pub error_type: crate::error::ErrorKind,
    pub is_retryable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub owner: JobOwner,
    pub status: JobStatus,
    pub current_stage: Option<String>,
    pub progress_percent: i16,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
    /// Stage boolean flags, e.g. `parsing_completed`, `chunking_completed`.
    pub stage_flags: std::collections::BTreeMap<String, bool>,
    /// Durable artifact paths recorded for resumable retries.
    pub artifact_paths: std::collections::BTreeMap<String, String>,
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(owner: JobOwner) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            owner,
            status: JobStatus::Queued,
            current_stage: None,
            progress_percent: 0,
            message: None,
            details: None,
            stage_flags: Default::default(),
            artifact_paths: Default::default(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Extraction {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub document_id: Option<Uuid>,
    pub context: Option<String>,
    pub parser_used: Option<String>,
    pub pages: Option<i32>,
    pub status: JobStatus,
    #[sqlx(json)]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSpecItem {
    pub key: String,
    pub title: String,
    pub queries: Vec<String>,
    pub prefer_tables: bool,
    pub max_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub prompt_template: String,
    #[sqlx(json)]
    pub variables_schema: serde_json::Value,
    #[sqlx(json)]
    pub output_schema: serde_json::Value,
    pub output_format: String,
    pub min_documents: i32,
    pub max_documents: i32,
    #[sqlx(json)]
    pub retrieval_spec: Vec<RetrievalSpecItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    Direct,
    MapReduce,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    #[sqlx(json)]
    pub document_ids: Vec<Uuid>,
    #[sqlx(json)]
    pub variables: serde_json::Value,
    pub mode: Option<String>,
    pub status: JobStatus,
    #[sqlx(json)]
    pub artifact: Option<serde_json::Value>,
    #[sqlx(json)]
    pub section_summaries: Option<serde_json::Value>,
    pub token_usage: Option<i32>,
    pub cost: Option<f64>,
    pub citations_count: i32,
    #[sqlx(json)]
    pub validation_errors: Vec<String>,
    #[sqlx(json)]
    pub context_stats: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "fill_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateFillStatus {
    Queued,
    Processing,
    AwaitingReview,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Template {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub name: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemplateFillRun {
    pub id: Uuid,
    pub template_id: Uuid,
    pub document_id: Option<Uuid>,
    pub status: TemplateFillStatus,
    pub result_storage_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Extraction,
    Chat,
    WorkflowRun,
    TemplateFillRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub operation_id: Uuid,
    pub rating: Option<i16>,
    pub comment: Option<String>,
}
