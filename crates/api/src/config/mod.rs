pub mod settings;

pub use settings::{
    CustomHeadersConfig, DatabaseConfig, EmbeddingConfig, LimitsConfig, LlmConfig, MemoryConfig,
    PromptsConfig, RagConfig, RetrievalConfig, SecurityConfig, ServerConfig, Settings,
};
