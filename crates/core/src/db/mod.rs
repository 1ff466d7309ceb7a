pub mod chunks;
pub mod documents;
pub mod jobs;
pub mod membership;
pub mod pool;
pub mod sessions;
pub mod workflows;

pub use pool::DbPool;
