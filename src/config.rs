//! Configuration management for the stat catalog
//!
//! TOML configuration files with environment variable overrides and
//! sensible defaults.
//!
//! ```toml
//! [store]
//! backend = "redis"
//! record_key = "PersistentStats"
//! redis_url = "redis://127.0.0.1:6379"
//!
//! [monitoring]
//! metrics_enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::PERSISTENT_STATS_KEY;
use crate::error::{Error, Result};
use crate::store::{CoordinationStore, InMemoryStore, RedisStore, RedisStoreConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Coordination store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Which coordination store backs the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store
    Memory,
    /// Redis server
    Redis,
}

/// Coordination store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Backend selection
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Record key the catalog is persisted under
    #[serde(default = "default_record_key")]
    pub record_key: String,

    /// Redis server URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix for Redis keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Command timeout in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Record catalog cycles in Prometheus
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

// Default value functions
fn default_backend() -> StoreBackend { StoreBackend::Memory }
fn default_record_key() -> String { PERSISTENT_STATS_KEY.to_string() }
fn default_redis_url() -> String { "redis://127.0.0.1:6379".to_string() }
fn default_key_prefix() -> String { "kuba:stats:".to_string() }
fn default_connection_timeout_ms() -> u64 { 5_000 }
fn default_command_timeout_ms() -> u64 { 1_000 }
fn default_true() -> bool { true }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            record_key: default_record_key(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            connection_timeout_ms: default_connection_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_true(),
        }
    }
}

impl StoreConfig {
    /// Redis settings derived from this section
    pub fn redis_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::with_url(self.redis_url.clone())
            .key_prefix(self.key_prefix.clone())
            .connection_timeout(Duration::from_millis(self.connection_timeout_ms))
            .command_timeout(Duration::from_millis(self.command_timeout_ms))
            .tls(self.redis_url.starts_with("rediss://"))
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Store
        if let Ok(backend) = std::env::var("KUBA_STATS_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "memory" => self.store.backend = StoreBackend::Memory,
                "redis" => self.store.backend = StoreBackend::Redis,
                _ => {},
            }
        }
        if let Ok(record_key) = std::env::var("KUBA_STATS_RECORD_KEY") {
            self.store.record_key = record_key;
        }
        if let Ok(url) = std::env::var("KUBA_STATS_REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Ok(timeout) = std::env::var("KUBA_STATS_COMMAND_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.store.command_timeout_ms = t;
            }
        }

        // Monitoring
        if let Ok(enabled) = std::env::var("KUBA_STATS_METRICS_ENABLED") {
            if let Ok(enabled) = enabled.parse() {
                self.monitoring.metrics_enabled = enabled;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.record_key.is_empty() {
            return Err(Error::Configuration("Record key cannot be empty".to_string()));
        }
        if self.store.backend == StoreBackend::Redis {
            self.store
                .redis_config()
                .validate()
                .map_err(Error::Configuration)?;
        }
        Ok(())
    }

    /// Build the configured coordination store
    pub fn open_store(&self) -> Result<Arc<dyn CoordinationStore>> {
        self.validate()?;
        match self.store.backend {
            StoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
            StoreBackend::Redis => Ok(Arc::new(RedisStore::new(self.store.redis_config())?)),
        }
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }
}
