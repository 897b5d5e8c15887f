//! Booking Repository
//!
//! Row access and guarded status updates. Every transition is a single
//! UPDATE whose WHERE clause restates the precondition, so a lost race
//! shows up as zero affected rows instead of a silently clobbered status.
//! Services re-read and classify when a guard fails.

use super::RepoResult;
use shared::ScopeFilter;
use shared::models::{Booking, BookingFilter, BookingStatus};
use sqlx::{SqliteConnection, SqlitePool};

const BOOKING_SELECT: &str = "SELECT id, booking_no, member_id, coach_id, course_id, store_id, schedule_id, card_id, start_time, end_time, status, cancelled_at, cancellation_reason, rating, review_comment, reviewed_at, deleted_at, created_at, updated_at FROM booking";

pub async fn find_by_id(
    pool: &SqlitePool,
    scope: ScopeFilter,
    id: i64,
) -> RepoResult<Option<Booking>> {
    let sql = format!(
        "{BOOKING_SELECT} WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))"
    );
    let booking = sqlx::query_as::<_, Booking>(&sql)
        .bind(id)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .fetch_optional(pool)
        .await?;
    Ok(booking)
}

/// Insert a fully-assembled row (inside the creation transaction)
pub async fn insert(conn: &mut SqliteConnection, booking: &Booking) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO booking (id, booking_no, member_id, coach_id, course_id, store_id, schedule_id, card_id, start_time, end_time, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
    )
    .bind(booking.id)
    .bind(&booking.booking_no)
    .bind(booking.member_id)
    .bind(booking.coach_id)
    .bind(booking.course_id)
    .bind(booking.store_id)
    .bind(booking.schedule_id)
    .bind(booking.card_id)
    .bind(booking.start_time)
    .bind(booking.end_time)
    .bind(booking.status)
    .bind(booking.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// PENDING → CONFIRMED
pub async fn confirm(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET status = 'CONFIRMED', updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'PENDING'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// {PENDING, CONFIRMED} → CANCELLED (inside the cancellation transaction)
pub async fn cancel(
    conn: &mut SqliteConnection,
    id: i64,
    reason: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET status = 'CANCELLED', cancelled_at = ?1, cancellation_reason = ?2, updated_at = ?1 WHERE id = ?3 AND deleted_at IS NULL AND status IN ('PENDING', 'CONFIRMED')",
    )
    .bind(now)
    .bind(reason)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// CONFIRMED → COMPLETED
pub async fn complete(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET status = 'COMPLETED', updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'CONFIRMED'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// CONFIRMED → NO_SHOW
pub async fn mark_no_show(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET status = 'NO_SHOW', updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'CONFIRMED'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// One-shot review: only COMPLETED, only while unrated
pub async fn set_review(
    pool: &SqlitePool,
    id: i64,
    rating: i64,
    comment: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET rating = ?1, review_comment = ?2, reviewed_at = ?3, updated_at = ?3 WHERE id = ?4 AND deleted_at IS NULL AND status = 'COMPLETED' AND rating IS NULL",
    )
    .bind(rating)
    .bind(comment)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Move a non-terminal booking to a new interval (inside the reschedule
/// transaction, after the conflict re-check)
pub async fn update_times(
    conn: &mut SqliteConnection,
    id: i64,
    start_time: i64,
    end_time: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET start_time = ?1, end_time = ?2, updated_at = ?3 WHERE id = ?4 AND deleted_at IS NULL AND status IN ('PENDING', 'CONFIRMED')",
    )
    .bind(start_time)
    .bind(end_time)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Soft delete; only terminal bookings leave the books
pub async fn soft_delete(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status IN ('CANCELLED', 'COMPLETED', 'NO_SHOW')",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

const LIST_PRED: &str = "deleted_at IS NULL AND (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?2)) AND (?3 IS NULL OR member_id = ?3) AND (?4 IS NULL OR coach_id = ?4) AND (?5 IS NULL OR status = ?5) AND (?6 IS NULL OR start_time >= ?6) AND (?7 IS NULL OR start_time < ?7)";

pub async fn count(
    pool: &SqlitePool,
    scope: ScopeFilter,
    filter: &BookingFilter,
) -> RepoResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM booking WHERE {LIST_PRED}");
    let total: i64 = sqlx::query_scalar(&sql)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .bind(filter.member_id)
        .bind(filter.coach_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(pool)
        .await?;
    Ok(total as u64)
}

pub async fn list(
    pool: &SqlitePool,
    scope: ScopeFilter,
    filter: &BookingFilter,
    limit: u32,
    offset: u64,
) -> RepoResult<Vec<Booking>> {
    let sql = format!(
        "{BOOKING_SELECT} WHERE {LIST_PRED} ORDER BY start_time DESC LIMIT ?8 OFFSET ?9"
    );
    let bookings = sqlx::query_as::<_, Booking>(&sql)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .bind(filter.member_id)
        .bind(filter.coach_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;
    Ok(bookings)
}

/// Current status regardless of guards, for post-guard classification
pub async fn current_status(pool: &SqlitePool, id: i64) -> RepoResult<Option<BookingStatus>> {
    let status = sqlx::query_scalar::<_, BookingStatus>(
        "SELECT status FROM booking WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(status)
}
