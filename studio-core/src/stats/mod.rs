//! Aggregation queries
//!
//! Read-only summaries over the reservation and entitlement tables. These
//! sit outside the state machines and add no invariants of their own.

use crate::db::repository::RepoError;
use shared::{AppResult, ScopeFilter};
use serde::Serialize;
use sqlx::SqlitePool;

/// Booking counts by status over a time window
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookingStatusSummary {
    pub pending: u64,
    pub confirmed: u64,
    pub cancelled: u64,
    pub completed: u64,
    pub no_show: u64,
    pub total: u64,
}

/// Capacity usage of class sessions over a time window
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleUtilization {
    pub sessions: u64,
    pub capacity: u64,
    pub participants: u64,
}

impl ScheduleUtilization {
    /// Fill ratio in [0.0, 1.0]; zero-capacity windows report 0.0
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.participants as f64 / self.capacity as f64
        }
    }
}

/// Entitlement totals for one member
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemberCardSummary {
    pub cards: u64,
    pub active_cards: u64,
    pub total_sessions: u64,
    pub used_sessions: u64,
    pub remaining_sessions: u64,
}

/// Booking counts by status with the standard scope predicate and an
/// optional window on start_time
pub async fn booking_status_summary(
    pool: &SqlitePool,
    scope: ScopeFilter,
    from: Option<i64>,
    to: Option<i64>,
) -> AppResult<BookingStatusSummary> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM booking WHERE deleted_at IS NULL AND (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?2)) AND (?3 IS NULL OR start_time >= ?3) AND (?4 IS NULL OR start_time < ?4) GROUP BY status",
    )
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .map_err(RepoError::from)?;

    let mut summary = BookingStatusSummary::default();
    for (status, count) in rows {
        let count = count as u64;
        summary.total += count;
        match status.as_str() {
            "PENDING" => summary.pending = count,
            "CONFIRMED" => summary.confirmed = count,
            "CANCELLED" => summary.cancelled = count,
            "COMPLETED" => summary.completed = count,
            "NO_SHOW" => summary.no_show = count,
            other => tracing::warn!(status = other, "Unknown booking status in summary"),
        }
    }
    Ok(summary)
}

/// Session count, capacity and registrations over a window (SCHEDULED and
/// COMPLETED sessions; cancelled ones held no class)
pub async fn schedule_utilization(
    pool: &SqlitePool,
    scope: ScopeFilter,
    from: Option<i64>,
    to: Option<i64>,
) -> AppResult<ScheduleUtilization> {
    let (sessions, capacity, participants) = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT COUNT(*), COALESCE(SUM(max_participants), 0), COALESCE(SUM(current_participants), 0) FROM course_schedule WHERE deleted_at IS NULL AND status IN ('SCHEDULED', 'COMPLETED') AND (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?2)) AND (?3 IS NULL OR start_time >= ?3) AND (?4 IS NULL OR start_time < ?4)",
    )
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
    .map_err(RepoError::from)?;

    Ok(ScheduleUtilization {
        sessions: sessions as u64,
        capacity: capacity as u64,
        participants: participants as u64,
    })
}

/// Entitlement totals for one member across all card kinds
pub async fn member_card_summary(
    pool: &SqlitePool,
    scope: ScopeFilter,
    member_id: i64,
) -> AppResult<MemberCardSummary> {
    let (cards, active, total, used) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'ACTIVE' THEN 1 ELSE 0 END), 0), COALESCE(SUM(total_sessions), 0), COALESCE(SUM(used_sessions), 0) FROM card WHERE deleted_at IS NULL AND member_id = ?1 AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))",
    )
    .bind(member_id)
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .fetch_one(pool)
    .await
    .map_err(RepoError::from)?;

    Ok(MemberCardSummary {
        cards: cards as u64,
        active_cards: active as u64,
        total_sessions: total as u64,
        used_sessions: used as u64,
        remaining_sessions: (total - used).max(0) as u64,
    })
}
