//! Course Schedule Repository
//!
//! Capacity moves only through the guarded increment/decrement here; the
//! WHERE clause carries the headroom check so the ceiling can never be
//! crossed, no matter how many writers race.

use super::RepoResult;
use shared::ScopeFilter;
use shared::models::{CourseSchedule, ScheduleFilter};
use sqlx::{SqliteConnection, SqlitePool};

const SCHEDULE_SELECT: &str = "SELECT id, course_id, coach_id, store_id, start_time, end_time, max_participants, current_participants, status, cancelled_at, deleted_at, created_at, updated_at FROM course_schedule";

pub async fn find_by_id(
    pool: &SqlitePool,
    scope: ScopeFilter,
    id: i64,
) -> RepoResult<Option<CourseSchedule>> {
    let sql = format!(
        "{SCHEDULE_SELECT} WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))"
    );
    let schedule = sqlx::query_as::<_, CourseSchedule>(&sql)
        .bind(id)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .fetch_optional(pool)
        .await?;
    Ok(schedule)
}

/// Unscoped read over the caller's connection (creation-transaction reads;
/// scope has already been checked pool-level by the service)
pub async fn find_by_id_in(
    conn: &mut SqliteConnection,
    id: i64,
) -> RepoResult<Option<CourseSchedule>> {
    let sql = format!("{SCHEDULE_SELECT} WHERE id = ?1 AND deleted_at IS NULL");
    let schedule = sqlx::query_as::<_, CourseSchedule>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(schedule)
}

/// Insert a fully-assembled row (inside the creation transaction)
pub async fn insert(conn: &mut SqliteConnection, schedule: &CourseSchedule) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO course_schedule (id, course_id, coach_id, store_id, start_time, end_time, max_participants, current_participants, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
    )
    .bind(schedule.id)
    .bind(schedule.course_id)
    .bind(schedule.coach_id)
    .bind(schedule.store_id)
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .bind(schedule.max_participants)
    .bind(schedule.current_participants)
    .bind(schedule.status)
    .bind(schedule.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// SCHEDULED → CANCELLED
pub async fn cancel(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE course_schedule SET status = 'CANCELLED', cancelled_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'SCHEDULED'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// SCHEDULED → COMPLETED
pub async fn complete(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE course_schedule SET status = 'COMPLETED', updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'SCHEDULED'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Register one attendee. The guard verifies status and headroom in the
/// same statement, so `current_participants` can never exceed the maximum.
pub async fn add_participant(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE course_schedule SET current_participants = current_participants + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'SCHEDULED' AND current_participants < max_participants",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Release one attendee slot; floors at zero
pub async fn release_participant(
    conn: &mut SqliteConnection,
    id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE course_schedule SET current_participants = current_participants - 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND current_participants > 0",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Soft delete; refused while any attendee is still registered
pub async fn soft_delete(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE course_schedule SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND current_participants = 0",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

const LIST_PRED: &str = "deleted_at IS NULL AND (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?2)) AND (?3 IS NULL OR coach_id = ?3) AND (?4 IS NULL OR course_id = ?4) AND (?5 IS NULL OR status = ?5) AND (?6 IS NULL OR start_time >= ?6) AND (?7 IS NULL OR start_time < ?7)";

pub async fn count(
    pool: &SqlitePool,
    scope: ScopeFilter,
    filter: &ScheduleFilter,
) -> RepoResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM course_schedule WHERE {LIST_PRED}");
    let total: i64 = sqlx::query_scalar(&sql)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .bind(filter.coach_id)
        .bind(filter.course_id)
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
    filter: &ScheduleFilter,
    limit: u32,
    offset: u64,
) -> RepoResult<Vec<CourseSchedule>> {
    let sql = format!(
        "{SCHEDULE_SELECT} WHERE {LIST_PRED} ORDER BY start_time ASC LIMIT ?8 OFFSET ?9"
    );
    let schedules = sqlx::query_as::<_, CourseSchedule>(&sql)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .bind(filter.coach_id)
        .bind(filter.course_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;
    Ok(schedules)
}
