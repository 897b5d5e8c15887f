//! Catalog Models
//!
//! Minimal snapshots of the entities the core references but does not
//! manage: stores, members, coaches and courses. Their CRUD lives in outer
//! layers; the core only needs existence and scope resolution.

use serde::{Deserialize, Serialize};

/// Store entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Store {
    pub id: i64,
    pub brand_id: i64,
    pub name: String,
    pub deleted_at: Option<i64>,
}

/// Member entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Member {
    pub id: i64,
    pub store_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub deleted_at: Option<i64>,
}

/// Coach entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Coach {
    pub id: i64,
    pub store_id: i64,
    pub name: String,
    pub deleted_at: Option<i64>,
}

/// Course entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Course {
    pub id: i64,
    pub store_id: i64,
    pub name: String,
    /// Default session length in minutes
    pub duration_min: i64,
    /// Default coach, if the course is coach-bound
    pub coach_id: Option<i64>,
    pub deleted_at: Option<i64>,
}
