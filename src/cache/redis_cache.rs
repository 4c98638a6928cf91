//! Redis Backend Module
//!
//! Cache backend over a single multiplexed Redis connection that is opened
//! lazily and re-established in the background.
//!
//! Callers never wait on a connection attempt. While the adapter is not
//! connected every operation fails straight away with
//! [`BackendError::Unavailable`], and the reconnect routine keeps retrying on
//! its own schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use tracing::{debug, info, warn};

use crate::cache::backend::{BackendError, BackendResult, BackendStatus, CacheBackend};
use crate::cache::BackoffPolicy;

// == Settings ==
/// Connection parameters for [`RedisBackend`].
#[derive(Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: i64,
    /// Bound on a single connection attempt
    pub connect_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl std::fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            database: 0,
            connect_timeout: Duration::from_secs(1),
            backoff: BackoffPolicy::default(),
        }
    }
}

// == Connection State ==
enum ConnectionState {
    /// No attempt made yet, or the last attempt could not be scheduled
    Idle,
    /// The reconnect routine is running
    Connecting,
    /// `generation` identifies this connection among successive reconnects
    Ready {
        conn: MultiplexedConnection,
        generation: u64,
    },
}

struct Shared {
    client: redis::Client,
    endpoint: String,
    connect_timeout: Duration,
    backoff: BackoffPolicy,
    generations: AtomicU64,
    // Never held across an await.
    state: Mutex<ConnectionState>,
}

// == Redis Backend ==
/// Lazily connected Redis cache backend.
///
/// Cloning is cheap and clones share one connection.
#[derive(Clone)]
pub struct RedisBackend {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("endpoint", &self.shared.endpoint)
            .field("status", &self.status())
            .finish()
    }
}

impl RedisBackend {
    /// Builds the client. Performs no network I/O.
    pub fn new(settings: &RedisSettings) -> BackendResult<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(settings.host.clone(), settings.port),
            redis: RedisConnectionInfo {
                db: settings.database,
                password: settings.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info).map_err(|e| {
            BackendError::Unavailable(format!("Failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            shared: Arc::new(Shared {
                client,
                endpoint: format!("{}:{}", settings.host, settings.port),
                connect_timeout: settings.connect_timeout,
                backoff: settings.backoff,
                generations: AtomicU64::new(0),
                state: Mutex::new(ConnectionState::Idle),
            }),
        })
    }

    // == Connection ==
    /// Returns the live connection, or fails fast and makes sure a reconnect
    /// routine is running.
    fn connection(&self) -> BackendResult<(MultiplexedConnection, u64)> {
        let mut state = self.shared.state.lock();
        if let ConnectionState::Ready { conn, generation } = &*state {
            return Ok((conn.clone(), *generation));
        }
        if matches!(&*state, ConnectionState::Connecting) {
            return Err(BackendError::Unavailable(
                "Redis connection is being re-established".to_string(),
            ));
        }

        if spawn_connect(&self.shared) {
            *state = ConnectionState::Connecting;
        }
        Err(BackendError::Unavailable(
            "Redis connection not established yet".to_string(),
        ))
    }

    /// Drops a broken connection and schedules a reconnect.
    ///
    /// Errors from an older connection are ignored once a newer one is live.
    fn mark_disconnected(&self, failed: u64) {
        let mut state = self.shared.state.lock();
        if matches!(&*state, ConnectionState::Ready { generation, .. } if *generation == failed) {
            warn!(endpoint = %self.shared.endpoint, "Redis connection lost, reconnecting");
            *state = if spawn_connect(&self.shared) {
                ConnectionState::Connecting
            } else {
                ConnectionState::Idle
            };
        }
    }

    /// Maps a command error, tearing down the connection if it is dead.
    fn command_error(&self, op: &str, generation: u64, err: RedisError) -> BackendError {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            self.mark_disconnected(generation);
            BackendError::Unavailable(format!("Redis {} failed: {}", op, err))
        } else if err.is_timeout() {
            BackendError::Timeout(format!("Redis {} timed out: {}", op, err))
        } else {
            BackendError::Command(format!("Redis {} failed: {}", op, err))
        }
    }
}

/// Starts the reconnect routine on the current runtime.
///
/// Returns false when called outside a tokio runtime; the caller then stays
/// `Idle` so a later call can try again.
fn spawn_connect(shared: &Arc<Shared>) -> bool {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return false;
    };
    runtime.spawn(connect_loop(Arc::clone(shared)));
    true
}

async fn connect_loop(shared: Arc<Shared>) {
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        let outcome = tokio::time::timeout(
            shared.connect_timeout,
            shared.client.get_multiplexed_async_connection(),
        )
        .await;

        let error = match outcome {
            Ok(Ok(conn)) => {
                let generation = shared.generations.fetch_add(1, Ordering::Relaxed) + 1;
                *shared.state.lock() = ConnectionState::Ready { conn, generation };
                info!(endpoint = %shared.endpoint, attempt, generation, "Redis cache connected");
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", shared.connect_timeout),
        };

        let delay = shared.backoff.delay(attempt);
        if attempt == 1 {
            warn!(
                endpoint = %shared.endpoint,
                error = %error,
                "Redis cache unreachable, serving from the store until it returns"
            );
        } else {
            debug!(
                endpoint = %shared.endpoint,
                attempt,
                error = %error,
                ?delay,
                "Redis reconnect failed"
            );
        }
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let (mut conn, generation) = self.connection()?;
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| self.command_error("GET", generation, e))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> BackendResult<()> {
        let (mut conn, generation) = self.connection()?;
        // SETEX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);

        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_seconds)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| self.command_error("SETEX", generation, e))
    }

    async fn delete_many(&self, keys: &[String]) -> BackendResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let (mut conn, generation) = self.connection()?;

        redis::cmd("DEL")
            .arg(keys)
            .query_async::<u64>(&mut conn)
            .await
            .map_err(|e| self.command_error("DEL", generation, e))
    }

    fn status(&self) -> BackendStatus {
        match &*self.shared.state.lock() {
            ConnectionState::Idle => BackendStatus::Disconnected,
            ConnectionState::Connecting => BackendStatus::Connecting,
            ConnectionState::Ready { .. } => BackendStatus::Connected,
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
