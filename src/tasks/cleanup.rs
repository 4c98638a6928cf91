//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of the
//! in-memory cache backend. Redis expires keys on its own.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryBackend;

/// Spawns a background task that periodically removes expired entries.
///
/// The returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let backend = MemoryBackend::new(1000);
/// let cleanup_handle = spawn_cleanup_task(backend.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(backend: MemoryBackend, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
