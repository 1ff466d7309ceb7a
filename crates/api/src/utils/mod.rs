pub mod error;
pub mod limiters;
pub mod response;

pub use error::ApiError;
pub use limiters::Limiters;
