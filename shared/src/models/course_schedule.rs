//! Course Schedule Model (排课)
//!
//! A capacity-bounded class session run by one coach. Participant counts are
//! only ever moved by guarded updates in studio-core; the invariant
//! `0 <= current_participants <= max_participants` is enforced there.

use serde::{Deserialize, Serialize};

/// Schedule status: `SCHEDULED → {COMPLETED, CANCELLED}`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum ScheduleStatus {
    #[serde(rename = "SCHEDULED")]
    #[cfg_attr(feature = "db", sqlx(rename = "SCHEDULED"))]
    Scheduled,
    #[serde(rename = "COMPLETED")]
    #[cfg_attr(feature = "db", sqlx(rename = "COMPLETED"))]
    Completed,
    #[serde(rename = "CANCELLED")]
    #[cfg_attr(feature = "db", sqlx(rename = "CANCELLED"))]
    Cancelled,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 3] = [
        ScheduleStatus::Scheduled,
        ScheduleStatus::Completed,
        ScheduleStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "SCHEDULED",
            ScheduleStatus::Completed => "COMPLETED",
            ScheduleStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ScheduleStatus::Scheduled)
    }

    /// Only SCHEDULED sessions participate in coach conflict checks
    pub fn occupies_slot(self) -> bool {
        matches!(self, ScheduleStatus::Scheduled)
    }

    pub fn can_transition_to(self, next: ScheduleStatus) -> bool {
        matches!(
            (self, next),
            (ScheduleStatus::Scheduled, ScheduleStatus::Completed)
                | (ScheduleStatus::Scheduled, ScheduleStatus::Cancelled)
        )
    }
}

/// Course schedule entity (DB row / snapshot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CourseSchedule {
    pub id: i64,
    pub course_id: i64,
    pub coach_id: i64,
    pub store_id: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub max_participants: i64,
    pub current_participants: i64,
    pub status: ScheduleStatus,
    pub cancelled_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CourseSchedule {
    /// Remaining headroom for registrations
    pub fn headroom(&self) -> i64 {
        (self.max_participants - self.current_participants).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

/// Create schedule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCreate {
    pub course_id: i64,
    pub coach_id: i64,
    pub store_id: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub max_participants: i64,
}

/// List filter for schedules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFilter {
    pub coach_id: Option<i64>,
    pub course_id: Option<i64>,
    pub status: Option<ScheduleStatus>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}
