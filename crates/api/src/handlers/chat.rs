//! Chat endpoints: SSE-streamed conversational RAG turns plus
//! conversation-cache introspection.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::conversation::ChatStreamChunk;
use crate::state::AppState;
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
}

fn event_name(chunk: &ChatStreamChunk) -> &'static str {
    match chunk {
        ChatStreamChunk::Stage { .. } => "stage",
        ChatStreamChunk::Message { .. } => "message",
        ChatStreamChunk::Citation { .. } => "citation",
        ChatStreamChunk::Done { .. } => "done",
        ChatStreamChunk::Error { .. } => "error",
    }
}

/// POST /api/chat/stream — answers one turn as a sequence of named SSE
/// events (`stage`, `message`, `citation`, `done`, `error`), mirroring
/// `ChatStreamChunk`'s serde tag.
pub async fn chat_stream_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message cannot be empty".into()));
    }
    info!(session_id = %req.session_id, user_id = %req.user_id, "chat stream request");

    let manager = state.conversation_manager.clone();
    let inner = manager.handle_message(req.session_id, req.tenant_id, req.user_id, req.message);

    let stream = inner.map(|item| match item {
        Ok(chunk) => Ok(Event::default()
            .event(event_name(&chunk))
            .data(serde_json::to_string(&chunk).unwrap_or_default())),
        Err(e) => {
            error!(error = %e.message, "chat stream error");
            Ok(Event::default()
                .event("error")
                .data(format!("{{\"message\": \"{}\"}}", e.message)))
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub active_sessions: usize,
    pub can_create_new_session: bool,
}

/// GET /api/chat/stats
pub async fn cache_stats_handler(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    let (active_sessions, can_create_new_session) = state.conversation_manager.cache().stats();
    Json(CacheStatsResponse { active_sessions, can_create_new_session })
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub sessions_removed: usize,
}

/// POST /api/chat/cleanup — manual TTL sweep, normally run on a timer.
pub async fn cleanup_sessions_handler(State(state): State<Arc<AppState>>) -> Json<CleanupResponse> {
    let sessions_removed = state.conversation_manager.cache().cleanup_expired();
    info!(sessions_removed, "manual conversation cache cleanup");
    Json(CleanupResponse { sessions_removed })
}
