//! Re-exports the shared `LocalStorage` backend from `docint-core` so both
//! the request plane and the worker plane construct the same vendor against
//! the same upload root.

pub use docint_core::storage::LocalStorage;
