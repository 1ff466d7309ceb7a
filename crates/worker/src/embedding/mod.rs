pub mod provider;

pub use provider::WorkerEmbeddingProvider;
