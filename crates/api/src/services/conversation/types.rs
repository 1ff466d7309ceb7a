//! Conversation cache entry types, keyed to `Uuid` against the session
//! store.

use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ConversationState {
    pub session_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub document_ids: Vec<Uuid>,
    pub last_query_embedding: Option<Vec<f32>>,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl ConversationState {
    pub fn new(session_id: Uuid, tenant_id: Uuid, user_id: Uuid, document_ids: Vec<Uuid>) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            tenant_id,
            user_id,
            document_ids,
            last_query_embedding: None,
            created_at: now,
            last_activity: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    FollowUpSimilarToLastQuery,
    MetaQuestion,
}

#[derive(Debug, Clone)]
pub enum RetrievalDecision {
    Retrieve,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamChunk {
    Stage { stage: String, message: String },
    Message { delta: String },
    Citation { tokens: Vec<String> },
    Done { message_id: Uuid },
    Error { message: String },
}
