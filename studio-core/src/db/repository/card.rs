//! Card Repository
//!
//! The entitlement ledger's persistence. Consumption is protected by the
//! `version` column: the UPDATE restates version, status, expiry and the
//! session counter, so two racing consumers reading used_sessions = N can
//! never both write N + 1. A failed guard affects zero rows; the service
//! re-reads and classifies.

use super::RepoResult;
use shared::ScopeFilter;
use shared::models::{Card, CardFilter, CardStatus};
use sqlx::{SqliteConnection, SqlitePool};

const CARD_SELECT: &str = "SELECT id, card_number, kind, member_id, store_id, parent_card_id, coach_id, total_sessions, used_sessions, price, status, issue_date, activation_date, expiry_date, validity_days, version, deleted_at, created_at, updated_at FROM card";

pub async fn find_by_id(pool: &SqlitePool, scope: ScopeFilter, id: i64) -> RepoResult<Option<Card>> {
    let sql = format!(
        "{CARD_SELECT} WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))"
    );
    let card = sqlx::query_as::<_, Card>(&sql)
        .bind(id)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .fetch_optional(pool)
        .await?;
    Ok(card)
}

/// Unscoped read over the caller's connection (creation-transaction reads;
/// scope has already been checked pool-level by the service)
pub async fn find_by_id_in(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Card>> {
    let sql = format!("{CARD_SELECT} WHERE id = ?1 AND deleted_at IS NULL");
    let card = sqlx::query_as::<_, Card>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(card)
}

pub async fn insert(pool: &SqlitePool, card: &Card) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO card (id, card_number, kind, member_id, store_id, parent_card_id, coach_id, total_sessions, used_sessions, price, status, issue_date, expiry_date, validity_days, version, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
    )
    .bind(card.id)
    .bind(&card.card_number)
    .bind(card.kind)
    .bind(card.member_id)
    .bind(card.store_id)
    .bind(card.parent_card_id)
    .bind(card.coach_id)
    .bind(card.total_sessions)
    .bind(card.used_sessions)
    .bind(card.price)
    .bind(card.status)
    .bind(card.issue_date)
    .bind(card.expiry_date)
    .bind(card.validity_days)
    .bind(card.version)
    .bind(card.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// INACTIVE → ACTIVE; stamps the activation date and derives the expiry
/// date from validity_days when none was fixed at purchase
pub async fn activate(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET status = 'ACTIVE', activation_date = ?1, expiry_date = COALESCE(expiry_date, CASE WHEN validity_days IS NOT NULL THEN ?1 + validity_days * 86400000 END), version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'INACTIVE'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Consume one session. The optimistic guard: version must still match the
/// value the caller read, the card must be ACTIVE, unexpired and have
/// headroom. Zero affected rows means the caller lost a race or the state
/// changed; it re-reads and decides.
pub async fn consume(
    conn: &mut SqliteConnection,
    id: i64,
    version: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET used_sessions = used_sessions + 1, version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND version = ?3 AND status = 'ACTIVE' AND used_sessions < total_sessions AND (expiry_date IS NULL OR expiry_date >= ?1)",
    )
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Give one session back (booking cancellation); floors at zero
pub async fn release_session(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET used_sessions = used_sessions - 1, version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND used_sessions > 0",
    )
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// ACTIVE → FROZEN
pub async fn freeze(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET status = 'FROZEN', version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'ACTIVE'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// FROZEN → ACTIVE
pub async fn unfreeze(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET status = 'ACTIVE', version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status = 'FROZEN'",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Any non-terminal status → EXPIRED
pub async fn expire(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET status = 'EXPIRED', version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status IN ('INACTIVE', 'ACTIVE', 'FROZEN')",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Bulk entry point for the external expiry sweep: every non-terminal card
/// whose expiry date has passed moves to EXPIRED. Returns the swept count.
pub async fn expire_due(pool: &SqlitePool, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE card SET status = 'EXPIRED', version = version + 1, updated_at = ?1 WHERE deleted_at IS NULL AND status IN ('INACTIVE', 'ACTIVE', 'FROZEN') AND expiry_date IS NOT NULL AND expiry_date < ?1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected())
}

/// Any non-terminal status → REFUNDED
pub async fn refund(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET status = 'REFUNDED', version = version + 1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND status IN ('INACTIVE', 'ACTIVE', 'FROZEN')",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Soft delete; refused once any session has been consumed (the refund
/// workflow is the way out for partially-used cards)
pub async fn soft_delete(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE card SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL AND used_sessions = 0",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

const LIST_PRED: &str = "deleted_at IS NULL AND (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?2)) AND (?3 IS NULL OR member_id = ?3) AND (?4 IS NULL OR kind = ?4) AND (?5 IS NULL OR status = ?5)";

pub async fn count(pool: &SqlitePool, scope: ScopeFilter, filter: &CardFilter) -> RepoResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM card WHERE {LIST_PRED}");
    let total: i64 = sqlx::query_scalar(&sql)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .bind(filter.member_id)
        .bind(filter.kind)
        .bind(filter.status)
        .fetch_one(pool)
        .await?;
    Ok(total as u64)
}

pub async fn list(
    pool: &SqlitePool,
    scope: ScopeFilter,
    filter: &CardFilter,
    limit: u32,
    offset: u64,
) -> RepoResult<Vec<Card>> {
    let sql = format!("{CARD_SELECT} WHERE {LIST_PRED} ORDER BY issue_date DESC LIMIT ?6 OFFSET ?7");
    let cards = sqlx::query_as::<_, Card>(&sql)
        .bind(scope.store_bind())
        .bind(scope.brand_bind())
        .bind(filter.member_id)
        .bind(filter.kind)
        .bind(filter.status)
        .bind(limit)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;
    Ok(cards)
}

/// Current status for post-guard classification
pub async fn current_status(pool: &SqlitePool, id: i64) -> RepoResult<Option<CardStatus>> {
    let status = sqlx::query_scalar::<_, CardStatus>(
        "SELECT status FROM card WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(status)
}
