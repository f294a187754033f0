//! Policy store database configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://warden.db", "sqlite::memory:")
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of database connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_connection_timeout")]
    pub connection_timeout: Duration,

    /// Upper bound for a single policy store call before it is reported unavailable
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_store_timeout")]
    pub store_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            store_timeout: default_store_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Whether the configured URL points at an in-memory SQLite database
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

impl Validatable for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.url, "url", self.domain_name())?;
        validate_positive(self.max_connections, "max_connections", self.domain_name())?;

        if self.connection_timeout.is_zero() {
            return Err(self.validation_error("connection_timeout must be greater than 0"));
        }

        if self.store_timeout.is_zero() {
            return Err(self.validation_error("store_timeout must be greater than 0"));
        }

        // A pooled in-memory database would give every connection its own empty schema
        if self.is_in_memory() && self.max_connections != 1 {
            return Err(self.validation_error(
                "in-memory databases require max_connections = 1",
            ));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "database"
    }
}

fn default_database_url() -> String {
    "sqlite://warden.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_config() {
        let config = DatabaseConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_in_memory());
        assert_eq!(config.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_in_memory_requires_single_connection() {
        let mut config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.max_connections = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_store_timeout_rejected() {
        let config = DatabaseConfig {
            store_timeout: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store_timeout"));
    }
}
