use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use docint_api::config::Settings;
use docint_api::security::{security_middleware, CustomHeaderValidator, DocumentAuthorization, IpWhitelist};
use docint_api::services::conversation::{ConversationCache, ConversationManager, ManagerConfig};
use docint_api::services::{
    ComparisonEngine, ContextExpander, DocumentService, EmbeddingService, HybridRetriever,
    LlmService, LocalStorage, WorkflowEngine,
};
use docint_api::state::AppState;
use docint_api::utils::limiters::Limiters;
use docint_api::handlers;

use docint_core::bus::InProcessProgressBus;
use docint_core::db::chunks::ChunkStore;
use docint_core::db::documents::DocumentStore;
use docint_core::db::jobs::JobStore;
use docint_core::db::membership::MembershipStore;
use docint_core::db::sessions::SessionStore;
use docint_core::db::workflows::WorkflowStore;
use docint_core::db::DbPool;
use docint_core::traits::{EmbeddingProvider, LlmProvider, ProgressBus};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,docint_api=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("starting docint API server");

    let settings = Settings::load()?;
    info!("configuration loaded");

    let db_pool = DbPool::connect(
        &settings.database.url,
        settings.database.pool_max_size,
        settings.database.pool_timeout_seconds,
    )
    .await?;
    info!("database connection established");

    let documents = Arc::new(DocumentStore::new(db_pool.clone()));
    let chunks = Arc::new(ChunkStore::new(db_pool.clone()));
    let jobs = Arc::new(JobStore::new(db_pool.clone()));
    let membership = Arc::new(MembershipStore::new(db_pool.clone()));
    let sessions = Arc::new(SessionStore::new(db_pool.clone()));
    let workflows = Arc::new(WorkflowStore::new(db_pool.clone()));

    let limiters = Arc::new(Limiters::new(&settings.limits));

    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(EmbeddingService::new(&settings.embedding, limiters.clone()));
    let llm: Arc<dyn LlmProvider> = Arc::new(LlmService::new(settings.llm.clone()));

    let progress_bus: Arc<dyn ProgressBus> = Arc::new(InProcessProgressBus::new());

    let storage = Arc::new(LocalStorage::new("./data/uploads"));
    let document_service = Arc::new(DocumentService::new(documents.clone(), jobs.clone(), storage));

    let retriever = Arc::new(HybridRetriever::new(
        chunks.clone(),
        embedder.clone(),
        settings.retrieval.clone(),
    ));
    let expander = Arc::new(ContextExpander::new(chunks.clone()));
    let comparison_engine = Arc::new(ComparisonEngine::new(retriever.clone(), llm.clone()));
    let workflow_engine = Arc::new(WorkflowEngine::new(workflows.clone(), retriever.clone(), llm.clone()));

    let conversation_cache = Arc::new(ConversationCache::new(Duration::from_secs(60 * 60)));
    let conversation_manager = Arc::new(ConversationManager::new(
        conversation_cache,
        sessions.clone(),
        membership.clone(),
        retriever.clone(),
        expander.clone(),
        embedder.clone(),
        llm.clone(),
        (&settings.memory).into(),
        ManagerConfig {
            rerank_window: settings.rag.retrieval_top_k,
            rerank_token_budget: settings.retrieval.rerank_token_budget,
            diversity_ratio: settings.retrieval.diversity_ratio,
            max_expansion_per_chunk: settings.retrieval.max_expansion_per_chunk,
            system_prompt: settings.prompts.main_system_prompt.clone(),
        },
    ));

    let ip_whitelist = Arc::new(IpWhitelist::new(
        settings.config_path(),
        settings.security.allowed_ips.clone(),
    )?);
    (*ip_whitelist).clone().start_watcher()?;
    info!("IP whitelist watcher started");

    let header_validator = Arc::new(CustomHeaderValidator::new(
        settings.security.custom_headers.app_id.clone(),
        settings.security.custom_headers.api_key.clone(),
        settings.security.custom_headers.request_signature == "enabled",
        settings.security.custom_headers.timestamp_tolerance,
    ));

    let document_auth = Arc::new(DocumentAuthorization::new(documents.clone()));

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let state = Arc::new(AppState {
        db_pool,
        documents,
        chunks,
        jobs,
        membership,
        sessions,
        workflows,
        embedder,
        llm,
        progress_bus,
        conversation_manager,
        document_service,
        workflow_engine,
        comparison_engine,
        settings,
        document_auth,
        ip_whitelist,
        header_validator,
        limiters,
    });

    let app = build_router(state, retriever);

    info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>, retriever: Arc<HybridRetriever>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let protected_routes = Router::new()
        .route("/api/chat/stream", post(handlers::chat::chat_stream_handler))
        .route("/api/chat/stats", get(handlers::chat::cache_stats_handler))
        .route("/api/chat/cleanup", post(handlers::chat::cleanup_sessions_handler))
        .route("/api/search", post(handlers::search::search_handler))
        .route("/api/upload", post(handlers::upload::upload_handler))
        .route("/api/documents", get(handlers::search::list_documents_handler))
        .route("/api/workflows/run", post(handlers::workflow::run_workflow_handler))
        .route("/api/compare", post(handlers::workflow::compare_handler))
        .layer(middleware::from_fn(security_middleware))
        .layer(Extension(retriever))
        .layer(Extension(state.document_auth.clone()))
        .layer(Extension(state.documents.clone()))
        .layer(Extension(state.ip_whitelist.clone()))
        .layer(Extension(state.header_validator.clone()));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
}
