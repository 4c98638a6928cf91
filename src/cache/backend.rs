//! Cache Backend Module
//!
//! Defines the key/value contract every cache backend implements and the
//! handle the rest of the service holds on to.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

// == Backend Error ==
/// Failure conditions a cache backend can report.
///
/// None of these ever reach a request handler: [`crate::cache::SafeCache`]
/// absorbs them and substitutes a fallback value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No usable connection (never connected, reconnecting, or disabled)
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete in time
    #[error("Cache backend timed out: {0}")]
    Timeout(String),

    /// The backend answered with an error
    #[error("Cache command failed: {0}")]
    Command(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// == Backend Status ==
/// Connection state of a backend, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Connected,
    Connecting,
    Disconnected,
    Disabled,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendStatus::Connected => "connected",
            BackendStatus::Connecting => "connecting",
            BackendStatus::Disconnected => "disconnected",
            BackendStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

// == Cache Backend Trait ==
/// A key/value store with per-entry expiry.
///
/// Values are opaque bytes. Every operation is failable; callers go through
/// [`crate::cache::SafeCache`] rather than using a backend directly.
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Returns the stored bytes, or `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()>;

    /// Removes every listed key in one call and returns how many existed.
    async fn delete_many(&self, keys: &[String]) -> BackendResult<u64>;

    /// Current connection state. Must not perform I/O.
    fn status(&self) -> BackendStatus;

    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;
}

// == Cache Handle ==
/// The cache as seen by the service: either a configured backend or nothing.
///
/// `Disabled` is used when no cache is provisioned. Every operation against it
/// fails immediately without touching the network.
#[derive(Clone)]
pub enum CacheHandle {
    /// A configured backend. Its connection may still be pending.
    Connected(Arc<dyn CacheBackend>),
    /// No backend configured
    Disabled,
}

impl CacheHandle {
    /// Wraps a concrete backend.
    pub fn connected<B: CacheBackend + 'static>(backend: B) -> Self {
        CacheHandle::Connected(Arc::new(backend))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheHandle::Connected(_))
    }

    /// Backend name, or `"disabled"`.
    pub fn name(&self) -> &'static str {
        match self {
            CacheHandle::Connected(backend) => backend.name(),
            CacheHandle::Disabled => "disabled",
        }
    }

    pub fn status(&self) -> BackendStatus {
        match self {
            CacheHandle::Connected(backend) => backend.status(),
            CacheHandle::Disabled => BackendStatus::Disabled,
        }
    }
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheHandle::Connected(backend) => f.debug_tuple("Connected").field(backend).finish(),
            CacheHandle::Disabled => f.write_str("Disabled"),
        }
    }
}
