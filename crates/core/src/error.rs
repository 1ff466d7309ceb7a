use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error taxonomy shared by the API and worker crates so Job Ledger
/// records and HTTP error bodies speak the same vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    UpgradeRequired,
    ParsingError,
    ChunkingError,
    EmbeddingError,
    StorageError,
    LlmError,
    SummarizingError,
    ExtractingError,
    StreamError,
    Timeout,
}

impl ErrorKind {
    /// Whether a stage failing with this kind may be retried from the
    /// durable upstream artifact.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::Validation
                | ErrorKind::NotFound
                | ErrorKind::Forbidden
                | ErrorKind::Conflict
                | ErrorKind::UpgradeRequired
                | ErrorKind::ParsingError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UpgradeRequired => "upgrade_required",
            ErrorKind::ParsingError => "parsing_error",
            ErrorKind::ChunkingError => "chunking_error",
            ErrorKind::EmbeddingError => "embedding_error",
            ErrorKind::StorageError => "storage_error",
            ErrorKind::LlmError => "llm_error",
            ErrorKind::SummarizingError => "summarizing_error",
            ErrorKind::ExtractingError => "extracting_error",
            ErrorKind::StreamError => "stream_error",
            ErrorKind::Timeout => "timeout",
        }
    }
}

#[derive(Error, Debug)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::new(ErrorKind::StorageError, e.to_string())
    }
}
