use docint_core::error::{CoreError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::DocumentNotFound(_) | WorkerError::JobNotFound(_) => ErrorKind::NotFound,
            WorkerError::FileNotFound(_) | WorkerError::UnsupportedFileType(_) | WorkerError::ParsingError(_) => {
                ErrorKind::ParsingError
            }
            WorkerError::ChunkingError(_) => ErrorKind::ChunkingError,
            WorkerError::EmbeddingError(_) | WorkerError::HttpError(_) => ErrorKind::EmbeddingError,
            WorkerError::DatabaseError(_) | WorkerError::IoError(_) => ErrorKind::StorageError,
            WorkerError::ConfigError(_) => ErrorKind::Validation,
            WorkerError::Core(e) => e.kind,
            WorkerError::Unknown(_) => ErrorKind::StorageError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<anyhow::Error> for WorkerError {
    fn from(err: anyhow::Error) -> Self {
        WorkerError::Unknown(err.to_string())
    }
}
