//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Split an `object:action` permission string; both halves must be non-empty
pub fn parse_permission(value: &str) -> Option<(&str, &str)> {
    value
        .split_once(':')
        .filter(|(object, action)| !object.is_empty() && !action.is_empty())
}

/// Validate that a `object:action` permission string has two non-empty halves
pub fn validate_permission_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    match parse_permission(value) {
        Some(_) => Ok(()),
        None => Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} has invalid permission '{}', expected 'object:action'",
                field_name, value
            ),
        }),
    }
}
