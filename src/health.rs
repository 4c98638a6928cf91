//! Health Reporter
//!
//! Liveness plus a store probe. The store is required for a healthy report;
//! the cache is informational only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::cache::{BackendStatus, CacheHandle};
use crate::store::ProductStore;

/// Upper bound on the store probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub backend: &'static str,
    pub status: BackendStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryMetrics {
    /// Resident set size, when the platform exposes it
    pub resident_bytes: Option<u64>,
}

/// Body of GET /api/health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Store error message when unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: &'static str,
    pub cache: CacheHealth,
    pub memory: MemoryMetrics,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Produces [`HealthReport`]s.
#[derive(Clone)]
pub struct HealthReporter {
    store: Arc<dyn ProductStore>,
    cache: CacheHandle,
    version: String,
    started_at: Instant,
    probe_timeout: Duration,
}

impl HealthReporter {
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: CacheHandle,
        version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            version: version.into(),
            started_at: Instant::now(),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Pings the store and assembles the report.
    pub async fn probe(&self) -> HealthReport {
        let detail = match tokio::time::timeout(self.probe_timeout, self.store.ping()).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "Store probe timed out after {}ms",
                self.probe_timeout.as_millis()
            )),
        };

        if let Some(reason) = &detail {
            warn!(store = self.store.name(), error = %reason, "Health probe failed");
        }

        HealthReport {
            status: if detail.is_none() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            detail,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: self.version.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            store: self.store.name(),
            cache: CacheHealth {
                backend: self.cache.name(),
                status: self.cache.status(),
            },
            memory: MemoryMetrics {
                resident_bytes: resident_bytes(),
            },
        }
    }
}

/// Resident memory from the `VmRSS` line of /proc/self/status, which the
/// kernel reports in kB whatever the page size.
#[cfg(target_os = "linux")]
fn resident_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let kilobytes: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") => Some(kilobytes * 1024),
        _ => None,
    }
}

#[cfg(not(target_os = "linux"))]
fn resident_bytes() -> Option<u64> {
    None
}
