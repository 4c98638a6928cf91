//! Response DTOs for the catalog API
//!
//! Bodies that are not a bare product or product list.

use serde::Serialize;

use crate::cache::{BackendStatus, CacheHandle, CacheStatsSnapshot};

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend name ("redis", "memory" or "disabled")
    pub backend: &'static str,
    pub status: BackendStatus,
    #[serde(flatten)]
    pub counters: CacheStatsSnapshot,
}

impl StatsResponse {
    pub fn new(handle: &CacheHandle, counters: CacheStatsSnapshot) -> Self {
        Self {
            backend: handle.name(),
            status: handle.status(),
            counters,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
