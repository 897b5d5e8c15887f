//! Error types
//!
//! [`AppError`] is the typed failure surface of the core: every service
//! operation returns [`AppResult`] and callers map the code to their own
//! transport. Details carry structured context (the blocking resource, the
//! rejected transition, etc.) for debugging and for caller branching.

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create an already exists error
    pub fn already_exists(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::AlreadyExists, format!("{} already exists", r))
            .with_detail("resource", r)
    }

    /// Create a time conflict error
    pub fn time_conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TimeConflict, msg)
    }

    /// Create an invalid transition error, recording the rejected edge
    pub fn invalid_transition(entity: &str, from: &str, to: &str) -> Self {
        Self::with_message(
            ErrorCode::InvalidTransition,
            format!("{entity} cannot move from {from} to {to}"),
        )
        .with_detail("entity", entity)
        .with_detail("from", from)
        .with_detail("to", to)
    }

    /// Create a cancel window closed error
    pub fn cancel_window_closed(lead_min: i64) -> Self {
        Self::with_message(
            ErrorCode::CancelWindowClosed,
            format!("Cancellation requires at least {lead_min} minutes before start"),
        )
        .with_detail("lead_min", lead_min)
    }

    /// Create an already reviewed error
    pub fn already_reviewed() -> Self {
        Self::new(ErrorCode::AlreadyReviewed)
    }

    /// Create an insufficient entitlement error, recording the blocking reason
    pub fn insufficient_entitlement(reason: impl Into<String>) -> Self {
        let r = reason.into();
        Self::with_message(
            ErrorCode::InsufficientEntitlement,
            format!("No consumable session: {}", r),
        )
        .with_detail("reason", r)
    }

    /// Create a schedule full error
    pub fn schedule_full(schedule_id: i64) -> Self {
        Self::new(ErrorCode::ScheduleFull).with_detail("schedule_id", schedule_id)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Whether this error is a system (infrastructure) failure
    pub fn is_system(&self) -> bool {
        self.code.category().is_system()
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_message() {
        let err = AppError::new(ErrorCode::NotFound);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Resource not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_with_detail() {
        let err = AppError::validation("start must be before end")
            .with_detail("field", "start_time");
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "start_time");
    }

    #[test]
    fn test_invalid_transition_records_edge() {
        let err = AppError::invalid_transition("booking", "COMPLETED", "CONFIRMED");
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        let details = err.details.unwrap();
        assert_eq!(details.get("from").unwrap(), "COMPLETED");
        assert_eq!(details.get("to").unwrap(), "CONFIRMED");
    }

    #[test]
    fn test_insufficient_entitlement_reason() {
        let err = AppError::insufficient_entitlement("exhausted");
        assert_eq!(err.code, ErrorCode::InsufficientEntitlement);
        assert_eq!(err.details.unwrap().get("reason").unwrap(), "exhausted");
    }

    #[test]
    fn test_system_classification() {
        assert!(AppError::database("disk full").is_system());
        assert!(!AppError::time_conflict("coach busy").is_system());
    }

    #[test]
    fn test_display_is_message() {
        let err = AppError::with_message(ErrorCode::NotFound, "Booking not found");
        assert_eq!(format!("{}", err), "Booking not found");
    }
}
