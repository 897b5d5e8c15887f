//! Tenant scope predicate
//!
//! Callers resolve the requester's visibility once (from role + tenant
//! bindings) into a [`ScopeFilter`] value and thread it explicitly into
//! every core call. Repositories apply it as a fixed SQL predicate with
//! optional binds; rows outside the scope behave exactly like missing rows.

use serde::{Deserialize, Serialize};

/// Visibility of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum ScopeFilter {
    /// Platform admin: everything
    All,
    /// Brand manager: every store under the brand
    Brand(i64),
    /// Store manager: one store
    Store(i64),
}

impl ScopeFilter {
    /// Store bind for the standard scope predicate
    /// `(?1 IS NULL OR store_id = ?1)`
    pub fn store_bind(&self) -> Option<i64> {
        match self {
            ScopeFilter::Store(id) => Some(*id),
            _ => None,
        }
    }

    /// Brand bind for the standard scope predicate
    /// `(?2 IS NULL OR store_id IN (SELECT id FROM store WHERE brand_id = ?2))`
    pub fn brand_bind(&self) -> Option<i64> {
        match self {
            ScopeFilter::Brand(id) => Some(*id),
            _ => None,
        }
    }
}
