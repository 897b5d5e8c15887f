//! Unified error codes for the studio booking core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Booking errors
//! - 5xxx: Schedule errors
//! - 6xxx: Card / entitlement errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::ErrorCategory;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found (or outside the caller's tenant scope)
    NotFound = 3,
    /// Resource already exists (duplicate unique key)
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 4xxx: Booking ====================
    /// Temporal overlap with another non-terminal reservation
    TimeConflict = 4001,
    /// State-machine transition not permitted from the current status
    InvalidTransition = 4002,
    /// Cancellation window has closed (too close to start time)
    CancelWindowClosed = 4003,
    /// Booking has already been reviewed
    AlreadyReviewed = 4004,
    /// Booking cannot be completed before its end time has passed
    BookingNotFinished = 4005,

    // ==================== 5xxx: Schedule ====================
    /// Class session is at capacity
    ScheduleFull = 5001,
    /// Class session still has registered participants
    ScheduleHasParticipants = 5002,
    /// Class session must start in the future
    ScheduleInPast = 5003,

    // ==================== 6xxx: Card / entitlement ====================
    /// Session consumption attempted against an exhausted/inactive/expired card
    InsufficientEntitlement = 6001,
    /// Card is not in ACTIVE status
    CardNotActive = 6002,
    /// Card validity period has passed
    CardExpired = 6003,
    /// Parent membership card is not active
    ParentCardInactive = 6004,
    /// Card has consumed sessions and must go through the refund workflow
    CardInUse = 6005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Get the category this code belongs to
    pub fn category(self) -> ErrorCategory {
        match self.code() {
            9000..=9999 => ErrorCategory::System,
            _ => ErrorCategory::Business,
        }
    }

    /// Default human-readable message for this code
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::TimeConflict => "Time conflict with an existing reservation",
            ErrorCode::InvalidTransition => "Status transition not permitted",
            ErrorCode::CancelWindowClosed => "Cancellation window has closed",
            ErrorCode::AlreadyReviewed => "Booking has already been reviewed",
            ErrorCode::BookingNotFinished => "Booking has not finished yet",
            ErrorCode::ScheduleFull => "Class session is full",
            ErrorCode::ScheduleHasParticipants => "Class session still has participants",
            ErrorCode::ScheduleInPast => "Class session must start in the future",
            ErrorCode::InsufficientEntitlement => "No consumable session on this card",
            ErrorCode::CardNotActive => "Card is not active",
            ErrorCode::CardExpired => "Card has expired",
            ErrorCode::ParentCardInactive => "Parent membership card is not active",
            ErrorCode::CardInUse => "Card has consumed sessions, refund required",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => ErrorCode::Success,
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            4001 => ErrorCode::TimeConflict,
            4002 => ErrorCode::InvalidTransition,
            4003 => ErrorCode::CancelWindowClosed,
            4004 => ErrorCode::AlreadyReviewed,
            4005 => ErrorCode::BookingNotFinished,
            5001 => ErrorCode::ScheduleFull,
            5002 => ErrorCode::ScheduleHasParticipants,
            5003 => ErrorCode::ScheduleInPast,
            6001 => ErrorCode::InsufficientEntitlement,
            6002 => ErrorCode::CardNotActive,
            6003 => ErrorCode::CardExpired,
            6004 => ErrorCode::ParentCardInactive,
            6005 => ErrorCode::CardInUse,
            9001 => ErrorCode::InternalError,
            9002 => ErrorCode::DatabaseError,
            _ => return Err(format!("Unknown error code: {value}")),
        };
        Ok(code)
    }
}
