//! Catalog Repository
//!
//! Existence and snapshot reads for the externally-managed reference
//! entities (store, member, coach, course). Creation paths call these to
//! turn dangling or out-of-scope references into NotFound before writing.

use super::RepoResult;
use shared::ScopeFilter;
use shared::models::{Coach, Course, Member, Store};
use sqlx::SqlitePool;

pub async fn find_store(pool: &SqlitePool, scope: ScopeFilter, id: i64) -> RepoResult<Option<Store>> {
    let store = sqlx::query_as::<_, Store>(
        "SELECT id, brand_id, name, deleted_at FROM store WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR id = ?2) AND (?3 IS NULL OR brand_id = ?3)",
    )
    .bind(id)
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .fetch_optional(pool)
    .await?;
    Ok(store)
}

pub async fn find_member(pool: &SqlitePool, scope: ScopeFilter, id: i64) -> RepoResult<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(
        "SELECT id, store_id, name, phone, deleted_at FROM member WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))",
    )
    .bind(id)
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .fetch_optional(pool)
    .await?;
    Ok(member)
}

pub async fn find_coach(pool: &SqlitePool, scope: ScopeFilter, id: i64) -> RepoResult<Option<Coach>> {
    let coach = sqlx::query_as::<_, Coach>(
        "SELECT id, store_id, name, deleted_at FROM coach WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))",
    )
    .bind(id)
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .fetch_optional(pool)
    .await?;
    Ok(coach)
}

pub async fn find_course(pool: &SqlitePool, scope: ScopeFilter, id: i64) -> RepoResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(
        "SELECT id, store_id, name, duration_min, coach_id, deleted_at FROM course WHERE id = ?1 AND deleted_at IS NULL AND (?2 IS NULL OR store_id = ?2) AND (?3 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?3))",
    )
    .bind(id)
    .bind(scope.store_bind())
    .bind(scope.brand_bind())
    .fetch_optional(pool)
    .await?;
    Ok(course)
}
