pub mod runtime;
pub mod stages;

pub use runtime::PipelineRunner;
pub use stages::StageContext;
