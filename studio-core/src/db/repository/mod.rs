//! Repository Module
//!
//! CRUD and guarded-update operations over SQLite. Repositories are free
//! async functions taking `&SqlitePool` (single statements) or
//! `&mut SqliteConnection` (statements composed into a caller transaction).
//!
//! Tenant scoping: queries that honor a [`shared::ScopeFilter`] carry the
//! fixed predicate
//! `(?a IS NULL OR store_id = ?a) AND (?b IS NULL OR store_id IN
//! (SELECT id FROM store WHERE brand_id = ?b))`
//! with the scope's store/brand binds, so an out-of-scope row is
//! indistinguishable from a missing one.

pub mod booking;
pub mod card;
pub mod catalog;
pub mod course_schedule;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RepoError {
    /// A write-time conflict signal: the statement lost a race (lock
    /// contention or unique violation) and the caller may retry the whole
    /// check-then-act unit once.
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, RepoError::WriteConflict(_) | RepoError::Duplicate(_))
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return RepoError::Duplicate(db.message().to_string());
            }
            // SQLITE_BUSY / SQLITE_LOCKED surface as plain database errors
            let msg = db.message();
            if msg.contains("database is locked") || msg.contains("database table is locked") {
                return RepoError::WriteConflict(msg.to_string());
            }
        }
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for shared::AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => shared::AppError::not_found(msg),
            RepoError::Duplicate(msg) => shared::AppError::already_exists(msg),
            RepoError::WriteConflict(msg) => shared::AppError::time_conflict(msg),
            RepoError::Database(msg) => shared::AppError::database(msg),
            RepoError::Validation(msg) => shared::AppError::validation(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Failure of one attempt at an atomic check-then-act unit.
///
/// `Retryable` carries the write-time conflict signals (lock contention,
/// unique violation); the unit may be re-run exactly once. Everything else
/// is final and surfaces to the caller as-is.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Fatal(shared::AppError),
    Retryable(RepoError),
}

impl From<RepoError> for AttemptError {
    fn from(err: RepoError) -> Self {
        if err.is_write_conflict() {
            AttemptError::Retryable(err)
        } else {
            AttemptError::Fatal(err.into())
        }
    }
}

impl From<shared::AppError> for AttemptError {
    fn from(err: shared::AppError) -> Self {
        AttemptError::Fatal(err)
    }
}

pub(crate) type AttemptResult<T> = Result<T, AttemptError>;
