//! Safe Cache Module
//!
//! Fault isolation between the request path and the cache backend. Every
//! cache call made by the service goes through [`SafeCache`], which turns
//! any failure into a caller-supplied fallback value.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::cache::backend::{BackendError, BackendResult, CacheBackend, CacheHandle};
use crate::cache::stats::{CacheStats, CacheStatsSnapshot};

/// Default bound on a single cache operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(250);

// == Safe Cache ==
/// Cache access that cannot fail.
///
/// Disabled caches, backend errors, timeouts and panics inside an operation
/// are logged, counted, and replaced by the fallback. Clones share counters.
#[derive(Debug, Clone)]
pub struct SafeCache {
    handle: CacheHandle,
    stats: Arc<CacheStats>,
    op_timeout: Duration,
}

impl SafeCache {
    pub fn new(handle: CacheHandle, op_timeout: Duration) -> Self {
        Self {
            handle,
            stats: Arc::new(CacheStats::new()),
            op_timeout,
        }
    }

    /// A wrapper around [`CacheHandle::Disabled`].
    pub fn disabled() -> Self {
        Self::new(CacheHandle::Disabled, DEFAULT_OP_TIMEOUT)
    }

    pub fn handle(&self) -> &CacheHandle {
        &self.handle
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    // == Run ==
    /// Runs `f` against the backend and returns its value, or `fallback` if
    /// the cache is disabled or the operation fails in any way.
    ///
    /// `op` and `key` only label log lines.
    pub async fn run<T, F, Fut>(&self, op: &'static str, key: &str, fallback: T, f: F) -> T
    where
        F: FnOnce(Arc<dyn CacheBackend>) -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let backend = match &self.handle {
            CacheHandle::Connected(backend) => Arc::clone(backend),
            CacheHandle::Disabled => {
                self.stats.record_skip();
                trace!(op, key, "Cache disabled, skipping");
                return fallback;
            }
        };

        let error = match std::panic::catch_unwind(AssertUnwindSafe(|| f(backend))) {
            Ok(fut) => {
                let guarded = AssertUnwindSafe(fut).catch_unwind();
                match tokio::time::timeout(self.op_timeout, guarded).await {
                    Ok(Ok(Ok(value))) => return value,
                    Ok(Ok(Err(e))) => e,
                    Ok(Err(_)) => BackendError::Command(format!("{} panicked", op)),
                    Err(_) => BackendError::Timeout(format!(
                        "{} exceeded {}ms",
                        op,
                        self.op_timeout.as_millis()
                    )),
                }
            }
            Err(_) => BackendError::Command(format!("{} panicked", op)),
        };

        self.stats.record_failure();
        warn!(op, key, error = %error, "Cache operation failed, continuing without cache");
        fallback
    }

    // == Typed Helpers ==
    /// Looks up `key`. Any failure reads as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let owned = key.to_string();
        let value = self
            .run("get", key, None, |backend| async move {
                backend.get(&owned).await
            })
            .await;

        if value.is_some() {
            self.stats.record_hit();
            debug!(key, "Cache HIT");
        } else {
            self.stats.record_miss();
            debug!(key, "Cache MISS");
        }
        value
    }

    /// Writes `value` under `key`. Returns whether the write landed.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> bool {
        let owned = key.to_string();
        let written = self
            .run("set", key, false, |backend| async move {
                backend.set_with_ttl(&owned, &value, ttl).await.map(|()| true)
            })
            .await;

        if written {
            self.stats.record_write();
            debug!(key, ttl_seconds = ttl.as_secs(), "Cache SET");
        }
        written
    }

    /// Deletes `keys` in one batched call. Returns how many were removed.
    pub async fn invalidate(&self, keys: Vec<String>) -> u64 {
        let label = keys.join(",");
        let removed = self
            .run("delete", &label, 0, |backend| async move {
                backend.delete_many(&keys).await
            })
            .await;

        self.stats.record_invalidations(removed);
        debug!(keys = %label, removed, "Cache DEL");
        removed
    }
}
