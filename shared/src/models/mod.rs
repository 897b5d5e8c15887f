//! Data models
//!
//! Shared between studio-core and embedding request layers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflake values; all timestamps are `i64` Unix millis.

pub mod booking;
pub mod card;
pub mod catalog;
pub mod course_schedule;

// Re-exports
pub use booking::*;
pub use card::*;
pub use catalog::*;
pub use course_schedule::*;
