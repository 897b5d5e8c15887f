//! Booking Model (预约)
//!
//! A booking is one member's reservation of a course slot, optionally bound
//! to a coach, a class session and an entitlement card. Status transitions
//! are pure data here; persistence and clock live in studio-core.

use serde::{Deserialize, Serialize};

/// Booking status
///
/// `PENDING → {CONFIRMED, CANCELLED}`, `CONFIRMED → {COMPLETED, CANCELLED,
/// NO_SHOW}`. CANCELLED / COMPLETED / NO_SHOW are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum BookingStatus {
    #[serde(rename = "PENDING")]
    #[cfg_attr(feature = "db", sqlx(rename = "PENDING"))]
    Pending,
    #[serde(rename = "CONFIRMED")]
    #[cfg_attr(feature = "db", sqlx(rename = "CONFIRMED"))]
    Confirmed,
    #[serde(rename = "CANCELLED")]
    #[cfg_attr(feature = "db", sqlx(rename = "CANCELLED"))]
    Cancelled,
    #[serde(rename = "COMPLETED")]
    #[cfg_attr(feature = "db", sqlx(rename = "COMPLETED"))]
    Completed,
    #[serde(rename = "NO_SHOW")]
    #[cfg_attr(feature = "db", sqlx(rename = "NO_SHOW"))]
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
        BookingStatus::NoShow,
    ];

    /// Stored TEXT value for this status
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    /// Terminal statuses admit no further transition
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::NoShow
        )
    }

    /// Non-terminal bookings participate in conflict checks
    pub fn occupies_slot(self) -> bool {
        !self.is_terminal()
    }

    /// Whether the transition `self → next` is permitted
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::NoShow)
        )
    }
}

/// Cancellation window rule: a reservation may be cancelled only while `now`
/// is strictly more than `lead_ms` before its start time.
pub fn cancel_window_open(start_time: i64, now: i64, lead_ms: i64) -> bool {
    start_time - now > lead_ms
}

/// Booking entity (DB row / snapshot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: i64,
    /// Business number, unique (`BKyyyymmdd-XXXXXX`)
    pub booking_no: String,
    pub member_id: i64,
    pub coach_id: Option<i64>,
    pub course_id: i64,
    pub store_id: i64,
    /// Class session this booking registers into, if any
    pub schedule_id: Option<i64>,
    /// Entitlement card consumed at creation, if any
    pub card_id: Option<i64>,
    /// Unix millis, half-open interval `[start_time, end_time)`
    pub start_time: i64,
    pub end_time: i64,
    pub status: BookingStatus,
    pub cancelled_at: Option<i64>,
    pub cancellation_reason: Option<String>,
    /// 1..=5, set once by review
    pub rating: Option<i64>,
    pub review_comment: Option<String>,
    pub reviewed_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create booking payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreate {
    pub member_id: i64,
    pub course_id: i64,
    pub coach_id: Option<i64>,
    pub store_id: i64,
    pub schedule_id: Option<i64>,
    /// Card to consume one session from at creation
    pub card_id: Option<i64>,
    pub start_time: i64,
    pub end_time: i64,
}

/// Reschedule payload (time update on a non-terminal booking)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReschedule {
    pub start_time: i64,
    pub end_time: i64,
}

/// Review payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReview {
    pub rating: i64,
    pub comment: Option<String>,
}

/// List filter for bookings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub member_id: Option<i64>,
    pub coach_id: Option<i64>,
    pub status: Option<BookingStatus>,
    /// Window on start_time, millis, half-open
    pub from: Option<i64>,
    pub to: Option<i64>,
}
