//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{BackoffPolicy, RedisSettings, DEFAULT_OP_TIMEOUT};
use crate::catalog::CachePolicy;

/// Which cache backend to build when caching is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" | "in-memory" => Ok(CacheBackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Cache layer parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false no backend is built and every cache call is skipped
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub redis: RedisSettings,
    /// Record and collection TTLs
    pub policy: CachePolicy,
    /// Bound on a single cache operation
    pub op_timeout: Duration,
    /// Capacity of the in-memory backend
    pub max_entries: usize,
    /// In-memory backend sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Redis,
            redis: RedisSettings::default(),
            policy: CachePolicy::default(),
            op_timeout: DEFAULT_OP_TIMEOUT,
            max_entries: 1000,
            cleanup_interval: 1,
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Postgres connection string; `None` selects the in-memory store
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Insert the demo catalog into an empty store at startup
    pub seed_data: bool,
    /// Reported by the health endpoint
    pub app_version: String,
    pub cache: CacheConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` (3000), `DATABASE_URL` (unset), `DATABASE_MAX_CONNECTIONS` (5)
    /// - `SEED_DATA` (false), `APP_VERSION` (crate version)
    /// - `CACHE_ENABLED` (true), `CACHE_BACKEND` (redis | memory)
    /// - `REDIS_HOST` (localhost), `REDIS_PORT` (6379), `REDIS_PASSWORD`, `REDIS_DB` (0)
    /// - `CACHE_RECORD_TTL` / `CACHE_COLLECTION_TTL` in seconds (600 / 600)
    /// - `CACHE_OP_TIMEOUT_MS` (250), `CACHE_CONNECT_TIMEOUT_MS` (1000)
    /// - `CACHE_BACKOFF_BASE_MS` (50), `CACHE_BACKOFF_MULTIPLIER` (2.0),
    ///   `CACHE_BACKOFF_MAX_MS` (2000)
    /// - `CACHE_MAX_ENTRIES` (1000), `CLEANUP_INTERVAL` in seconds (1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache = defaults.cache;
        let backoff = cache.redis.backoff;

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            database_max_connections: env_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            seed_data: env_flag("SEED_DATA", defaults.seed_data),
            app_version: env::var("APP_VERSION").unwrap_or(defaults.app_version),
            cache: CacheConfig {
                enabled: env_flag("CACHE_ENABLED", cache.enabled),
                backend: env_or("CACHE_BACKEND", cache.backend),
                redis: RedisSettings {
                    host: env::var("REDIS_HOST").unwrap_or(cache.redis.host),
                    port: env_or("REDIS_PORT", cache.redis.port),
                    password: env::var("REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
                    database: env_or("REDIS_DB", cache.redis.database),
                    connect_timeout: env_millis(
                        "CACHE_CONNECT_TIMEOUT_MS",
                        cache.redis.connect_timeout,
                    ),
                    backoff: BackoffPolicy::new(
                        env_millis("CACHE_BACKOFF_BASE_MS", backoff.base),
                        env_or("CACHE_BACKOFF_MULTIPLIER", backoff.multiplier),
                        env_millis("CACHE_BACKOFF_MAX_MS", backoff.max),
                    ),
                },
                policy: CachePolicy {
                    record_ttl: env_secs("CACHE_RECORD_TTL", cache.policy.record_ttl),
                    collection_ttl: env_secs("CACHE_COLLECTION_TTL", cache.policy.collection_ttl),
                },
                op_timeout: env_millis("CACHE_OP_TIMEOUT_MS", cache.op_timeout),
                max_entries: env_or("CACHE_MAX_ENTRIES", cache.max_entries),
                cleanup_interval: env_or("CLEANUP_INTERVAL", cache.cleanup_interval),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_url: None,
            database_max_connections: 5,
            seed_data: false,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            cache: CacheConfig::default(),
        }
    }
}

// == Env Helpers ==
/// Parses `key`, keeping `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

/// A set but unparsable value is logged rather than silently ignored.
fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = raw, "Ignoring invalid environment value, using default");
            default
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(key, default.as_secs()))
}

fn env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(key, default.as_millis() as u64))
}
