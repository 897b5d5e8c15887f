//! Unified error handling
//!
//! - [`ErrorCode`] - numeric error codes organized in bands per domain
//! - [`AppError`] - structured error carrying code, message and details
//! - [`AppResult`] - result alias used across all service surfaces

pub mod category;
pub mod codes;
pub mod types;

pub use category::ErrorCategory;
pub use codes::ErrorCode;
pub use types::{AppError, AppResult};
