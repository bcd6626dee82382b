//! Redis-backed coordination store
//!
//! Each record lives under one Redis string key, `{key_prefix}{record_key}`,
//! holding the JSON-encoded [`Record`]. Every call opens a blocking
//! connection bounded by the configured timeouts; nothing is retried here.
//!
//! # Example
//!
//! ```rust,no_run
//! use kuba_stats::store::{CoordinationStore, RedisStore, RedisStoreConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::new(RedisStoreConfig::with_url("redis://localhost:6379"))?;
//! let record = store.get("PersistentStats")?;
//! # Ok(())
//! # }
//! ```

use ::redis::{Client, Connection};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::StoreError;

use super::record::Record;
use super::traits::CoordinationStore;
use super::util::{endpoint, safe_redis_error};

/// Configuration for the Redis store
#[derive(Clone, Debug)]
pub struct RedisStoreConfig {
    /// Redis server URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Prefix prepended to every record key
    /// Default: "kuba:stats:"
    pub key_prefix: String,

    /// Timeout for establishing a connection
    /// Default: 5 seconds
    pub connection_timeout: Duration,

    /// Read/write timeout for individual commands
    /// Default: 1 second
    pub command_timeout: Duration,

    /// Enable TLS for connections
    /// Default: false
    pub tls_enabled: bool,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "kuba:stats:".to_string(),
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(1),
            tls_enabled: false,
        }
    }
}

impl RedisStoreConfig {
    /// Create a new config with the specified URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Enable or disable TLS
    pub fn tls(mut self, enabled: bool) -> Self {
        self.tls_enabled = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if self.connection_timeout.is_zero() || self.command_timeout.is_zero() {
            return Err("Redis timeouts must be greater than 0".to_string());
        }

        #[cfg(not(feature = "redis-tls"))]
        if self.tls_enabled {
            return Err(
                "TLS is enabled but the 'redis-tls' feature is not compiled".to_string(),
            );
        }

        if self.tls_enabled && !self.url.starts_with("rediss://") {
            return Err("TLS is enabled but URL doesn't use 'rediss://' scheme".to_string());
        }
        if !self.tls_enabled && self.url.starts_with("rediss://") {
            return Err("URL uses 'rediss://' scheme but TLS is not enabled".to_string());
        }

        Ok(())
    }
}

/// Coordination store over a Redis server
pub struct RedisStore {
    client: Client,
    config: RedisStoreConfig,
}

impl RedisStore {
    /// Create a store; no connection is opened until the first call
    pub fn new(config: RedisStoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::ConnectionError)?;

        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::ConnectionError(safe_redis_error(&config.url, &e)))?;

        debug!(url = %endpoint(&config.url), "Created Redis store client");
        Ok(Self { client, config })
    }

    /// Full Redis key for a record key
    pub fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn connection(&self) -> Result<Connection, StoreError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.config.connection_timeout)
            .map_err(|e| {
                warn!(url = %endpoint(&self.config.url), "Redis connection failed");
                StoreError::ConnectionError(safe_redis_error(&self.config.url, &e))
            })?;

        conn.set_read_timeout(Some(self.config.command_timeout))
            .and_then(|_| conn.set_write_timeout(Some(self.config.command_timeout)))
            .map_err(|e| StoreError::ConnectionError(safe_redis_error(&self.config.url, &e)))?;

        Ok(conn)
    }
}

impl CoordinationStore for RedisStore {
    fn store_id(&self) -> &str {
        "redis-store-v1"
    }

    fn get(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let mut conn = self.connection()?;
        let raw: Option<String> = ::redis::cmd("GET")
            .arg(self.redis_key(key))
            .query(&mut conn)
            .map_err(|e| StoreError::CommandError(safe_redis_error(&self.config.url, &e)))?;

        raw.map(|json| Record::from_json(&json)).transpose()
    }

    fn set(&self, key: &str, record: &Record) -> Result<bool, StoreError> {
        let json = record.to_json()?;
        let mut conn = self.connection()?;
        ::redis::cmd("SET")
            .arg(self.redis_key(key))
            .arg(json)
            .query::<()>(&mut conn)
            .map_err(|e| StoreError::CommandError(safe_redis_error(&self.config.url, &e)))?;

        debug!(key = %self.redis_key(key), fields = record.map_fields.len(), "Wrote record");
        Ok(true)
    }
}
