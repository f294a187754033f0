//! Configuration loading and environment variable handling

use crate::domains::utils::duration_from_secs;
use crate::domains::WardenConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "WARDEN".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<WardenConfig> {
        debug!("Loading configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        self.from_yaml(&content)
    }

    /// Load configuration from YAML text with environment overrides
    pub fn from_yaml(&self, content: &str) -> ConfigResult<WardenConfig> {
        let mut config: WardenConfig = serde_yaml::from_str(content)?;
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<WardenConfig> {
        let mut config = WardenConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<WardenConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut WardenConfig) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(max) = self.get_env_var("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = self.parse_env("DATABASE_MAX_CONNECTIONS", &max)?;
        }
        if let Ok(timeout) = self.get_env_var("STORE_TIMEOUT_SECONDS") {
            config.database.store_timeout = self.parse_seconds("STORE_TIMEOUT_SECONDS", &timeout)?;
        }

        if let Ok(secret) = self.get_env_var("TOKEN_SECRET") {
            config.token.secret = secret;
        }
        if let Ok(ttl) = self.get_env_var("TOKEN_TTL_SECONDS") {
            config.token.ttl = self.parse_seconds("TOKEN_TTL_SECONDS", &ttl)?;
        }

        if let Ok(super_user) = self.get_env_var("SUPER_USER") {
            config.policy.super_user = if super_user.is_empty() {
                None
            } else {
                Some(super_user)
            };
        }
        if let Ok(wildcard) = self.get_env_var("WILDCARD_MATCHING") {
            config.policy.wildcard_matching = self.parse_env("WILDCARD_MATCHING", &wildcard)?;
        }
        if let Ok(interval) = self.get_env_var("RELOAD_INTERVAL_SECONDS") {
            config.policy.reload_interval =
                Some(self.parse_seconds("RELOAD_INTERVAL_SECONDS", &interval)?);
        }

        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.logging.level = log_level
                .parse()
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }
        if let Ok(log_format) = self.get_env_var("LOG_FORMAT") {
            config.logging.format = log_format
                .parse()
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", log_format)))?;
        }

        Ok(())
    }

    fn parse_env<T>(&self, name: &str, value: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {}_{}: {}", self.prefix, name, e)))
    }

    /// Parse a duration given in (possibly fractional) seconds
    fn parse_seconds(&self, name: &str, value: &str) -> ConfigResult<Duration> {
        let seconds: f64 = self.parse_env(name, value)?;
        duration_from_secs(seconds).ok_or_else(|| {
            ConfigError::EnvError(format!(
                "Invalid {}_{}: {} is not a duration in seconds",
                self.prefix, name, value
            ))
        })
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}
