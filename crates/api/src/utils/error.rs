use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docint_core::{CoreError, ErrorKind};
use serde::Serialize;
use thiserror::Error;

/// Wire-facing error enum; every variant maps 1:1 onto
/// `docint_core::ErrorKind` so Job Ledger records and HTTP error bodies
/// agree on one vocabulary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("LLM error: {0}")]
    LlmError(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e.kind {
            ErrorKind::Validation => ApiError::BadRequest(e.message),
            ErrorKind::NotFound => ApiError::NotFound(e.message),
            ErrorKind::Forbidden => ApiError::Forbidden(e.message),
            ErrorKind::Conflict | ErrorKind::UpgradeRequired => ApiError::Conflict(e.message),
            ErrorKind::StorageError => ApiError::DatabaseError(e.message),
            ErrorKind::LlmError | ErrorKind::StreamError | ErrorKind::Timeout => ApiError::LlmError(e.message),
            ErrorKind::ParsingError
            | ErrorKind::ChunkingError
            | ErrorKind::EmbeddingError
            | ErrorKind::SummarizingError
            | ErrorKind::ExtractingError => ApiError::InternalError(e.message),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Unauthorized(msg) => {
                tracing::warn!(%msg, "unauthorized");
                (StatusCode::UNAUTHORIZED, "Unauthorized", msg)
            }
            ApiError::Forbidden(msg) => {
                tracing::warn!(%msg, "forbidden");
                (StatusCode::FORBIDDEN, "Forbidden", msg)
            }
            ApiError::NotFound(msg) => {
                tracing::warn!(%msg, "not found");
                (StatusCode::NOT_FOUND, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(%msg, "bad request");
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(%msg, "conflict");
                (StatusCode::CONFLICT, "Conflict", msg)
            }
            ApiError::DatabaseError(msg) => {
                tracing::error!(%msg, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!(%msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
            ApiError::LlmError(msg) => {
                tracing::error!(%msg, "llm error");
                (StatusCode::SERVICE_UNAVAILABLE, "LlmError", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
