//! Domain-driven configuration management for Warden
//!
//! Configuration is split by functional domain (database, token, policy,
//! logging). Each domain validates itself, carries sensible defaults and can
//! be overridden from `WARDEN_*` environment variables.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    database::DatabaseConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    policy::{PolicyConfig, RoleDefinition},
    token::TokenConfig,
    WardenConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
