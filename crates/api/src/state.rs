use axum::extract::FromRef;
use std::sync::Arc;

use docint_core::db::chunks::ChunkStore;
use docint_core::db::documents::DocumentStore;
use docint_core::db::jobs::JobStore;
use docint_core::db::membership::MembershipStore;
use docint_core::db::sessions::SessionStore;
use docint_core::db::workflows::WorkflowStore;
use docint_core::db::DbPool;
use docint_core::traits::{EmbeddingProvider, LlmProvider, ProgressBus};

use crate::config::Settings;
use crate::security::{CustomHeaderValidator, DocumentAuthorization, IpWhitelist};
use crate::services::conversation::ConversationManager;
use crate::services::{ComparisonEngine, DocumentService, WorkflowEngine};
use crate::utils::limiters::Limiters;

/// Application state shared across handlers, built once in `main` and
/// cloned (cheaply, via `Arc`) into every request.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub documents: Arc<DocumentStore>,
    pub chunks: Arc<ChunkStore>,
    pub jobs: Arc<JobStore>,
    pub membership: Arc<MembershipStore>,
    pub sessions: Arc<SessionStore>,
    pub workflows: Arc<WorkflowStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub progress_bus: Arc<dyn ProgressBus>,
    pub conversation_manager: Arc<ConversationManager>,
    pub document_service: Arc<DocumentService>,
    pub workflow_engine: Arc<WorkflowEngine>,
    pub comparison_engine: Arc<ComparisonEngine>,
    pub settings: Settings,
    pub document_auth: Arc<DocumentAuthorization>,
    pub ip_whitelist: Arc<IpWhitelist>,
    pub header_validator: Arc<CustomHeaderValidator>,
    pub limiters: Arc<Limiters>,
}

impl FromRef<AppState> for Arc<ConversationManager> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_manager.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ProgressBus> {
    fn from_ref(state: &AppState) -> Self {
        state.progress_bus.clone()
    }
}
