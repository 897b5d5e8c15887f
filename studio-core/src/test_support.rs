//! Test fixtures
//!
//! Tempfile-backed SQLite databases with migrations applied and a small
//! two-store catalog seeded, so scope behavior is exercised for real.

use crate::db::Db;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const BRAND_A: i64 = 1;
pub const BRAND_B: i64 = 2;

pub const STORE_A: i64 = 100;
pub const STORE_B: i64 = 200;

pub const MEMBER_ANNA: i64 = 10;
pub const MEMBER_BEN: i64 = 11;
pub const MEMBER_RIVERSIDE: i64 = 12;

pub const COACH_LI: i64 = 5;
pub const COACH_WANG: i64 = 6;
pub const COACH_RIVERSIDE: i64 = 7;

pub const COURSE_YOGA: i64 = 20;
pub const COURSE_SPIN: i64 = 21;
pub const COURSE_RIVERSIDE: i64 = 22;

pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("studio-test.db");
    let db = Db::new(path.to_str().expect("utf8 temp path"))
        .await
        .expect("open test database");
    seed_catalog(&db.pool).await;
    TestDb {
        pool: db.pool,
        _dir: dir,
    }
}

async fn seed_catalog(pool: &SqlitePool) {
    for (id, brand, name) in [(STORE_A, BRAND_A, "Downtown"), (STORE_B, BRAND_B, "Riverside")] {
        sqlx::query("INSERT INTO store (id, brand_id, name) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(brand)
            .bind(name)
            .execute(pool)
            .await
            .expect("seed store");
    }
    for (id, store, name) in [
        (MEMBER_ANNA, STORE_A, "Anna"),
        (MEMBER_BEN, STORE_A, "Ben"),
        (MEMBER_RIVERSIDE, STORE_B, "Riley"),
    ] {
        sqlx::query("INSERT INTO member (id, store_id, name) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(store)
            .bind(name)
            .execute(pool)
            .await
            .expect("seed member");
    }
    for (id, store, name) in [
        (COACH_LI, STORE_A, "Li"),
        (COACH_WANG, STORE_A, "Wang"),
        (COACH_RIVERSIDE, STORE_B, "Rivera"),
    ] {
        sqlx::query("INSERT INTO coach (id, store_id, name) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(store)
            .bind(name)
            .execute(pool)
            .await
            .expect("seed coach");
    }
    for (id, store, name) in [
        (COURSE_YOGA, STORE_A, "Yoga"),
        (COURSE_SPIN, STORE_A, "Spin"),
        (COURSE_RIVERSIDE, STORE_B, "Pilates"),
    ] {
        sqlx::query("INSERT INTO course (id, store_id, name, duration_min) VALUES (?1, ?2, ?3, 60)")
            .bind(id)
            .bind(store)
            .bind(name)
            .execute(pool)
            .await
            .expect("seed course");
    }
}

/// Unix millis `min` minutes from now
pub fn minutes_from_now(min: i64) -> i64 {
    shared::util::now_millis() + min * 60_000
}

/// Unix millis `hours` hours from now
pub fn hours_from_now(hours: i64) -> i64 {
    minutes_from_now(hours * 60)
}
