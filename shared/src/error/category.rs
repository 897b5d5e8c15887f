//! Error categories
//!
//! Business errors are expected outcomes of domain rules and are returned to
//! the caller as-is; system errors indicate infrastructure failure and are
//! logged at error level where they surface.

use serde::{Deserialize, Serialize};

/// High-level category of an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Domain rule violation (validation, conflict, transition, entitlement)
    Business,
    /// Infrastructure failure (database, internal)
    System,
}

impl ErrorCategory {
    pub fn is_system(self) -> bool {
        matches!(self, ErrorCategory::System)
    }
}
