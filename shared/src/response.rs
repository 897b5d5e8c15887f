//! Response types
//!
//! Every list operation returns a [`PaginatedResponse`] so callers can page
//! without issuing a separate count query.

use serde::{Deserialize, Serialize};

/// Paginated list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Page of items
    pub items: Vec<T>,
    /// Total matching records
    pub total: u64,
    /// Current page (1-based)
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total pages
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit > 0 {
            total.div_ceil(limit as u64) as u32
        } else {
            1
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Single-page response for unpaginated reads
    pub fn single_page(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            total,
            page: 1,
            limit: total as u32,
            total_pages: 1,
        }
    }
}
