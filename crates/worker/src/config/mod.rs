pub mod settings;

pub use settings::{DatabaseConfig, EmbeddingConfig, PipelineConfig, Settings};
