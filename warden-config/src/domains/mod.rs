//! Domain-specific configuration modules

pub mod database;
pub mod logging;
pub mod policy;
pub mod token;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Warden configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    /// Policy store database configuration
    #[serde(default)]
    pub database: database::DatabaseConfig,

    /// Identity token configuration
    #[serde(default)]
    pub token: token::TokenConfig,

    /// Access-control policy configuration
    #[serde(default)]
    pub policy: policy::PolicyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl WardenConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.token.validate()?;
        self.policy.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = WardenConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
