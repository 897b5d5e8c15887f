//! Request types
//!
//! Pagination parameters accepted by every list operation.

/// Pagination query parameters
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PaginationQuery {
    /// Page number (1-based, default: 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) as u64 * self.limit() as u64
    }

    /// Limit clamped to max 100
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, 100)
    }
}
