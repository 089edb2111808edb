//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use conseater::db::DatabaseConfig;
use conseater::seating::DEFAULT_MAX_GROUP_SIZE;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 10;

/// Where queues and tables are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Expected 'postgres' or 'memory', got '{other}'"),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Storage backend
    pub storage: StorageBackend,
    /// How often orphan cleanup and gauge refresh run
    pub maintenance_interval: Duration,
    /// Prometheus exporter address, if metrics are enabled
    pub metrics_bind: Option<SocketAddr>,
    /// Largest party one enqueue request may add
    pub max_group_size: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Force the in-memory backend (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
            memory,
        )
    }

    /// Same as [`ServerConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(
        lookup: F,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?.unwrap_or(default_bind()?),
        };

        let mut database = DatabaseConfig::from_lookup(&lookup);
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let storage = if memory {
            StorageBackend::Memory
        } else {
            match lookup("STORAGE_BACKEND") {
                Some(raw) => raw.parse()?,
                None => StorageBackend::Postgres,
            }
        };

        let maintenance_interval = Duration::from_secs(
            parse_var(&lookup, "MAINTENANCE_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_MAINTENANCE_INTERVAL_SECS),
        );

        Ok(ServerConfig {
            bind,
            database,
            storage,
            maintenance_interval,
            metrics_bind: parse_var(&lookup, "METRICS_BIND")?,
            max_group_size: parse_var(&lookup, "MAX_GROUP_SIZE")?.unwrap_or(DEFAULT_MAX_GROUP_SIZE),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maintenance_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "MAINTENANCE_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.max_group_size == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_GROUP_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.storage == StorageBackend::Postgres {
            if self.database.database_url.is_empty() {
                return Err(ConfigError::Invalid {
                    var: "DATABASE_URL".to_string(),
                    reason: "Must not be empty".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("Default address {DEFAULT_BIND} is not valid"),
    })
}

/// Helper to parse an optional variable, rejecting values that are set but malformed
fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Cannot parse '{raw}'"),
        }),
        None => Ok(None),
    }
}
