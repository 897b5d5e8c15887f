//! Shared types for the studio booking core
//!
//! Data models, status state machines, the unified error taxonomy,
//! pagination types and the tenant scope predicate. Shared between
//! studio-core and any embedding request layer.

pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod scope;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use request::PaginationQuery;
pub use response::PaginatedResponse;
pub use scope::ScopeFilter;
pub use serde::{Deserialize, Serialize};
