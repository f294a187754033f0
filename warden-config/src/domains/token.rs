//! Identity token configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Signed identity token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared HMAC secret used to sign and verify tokens
    pub secret: String,

    /// Issuer claim written into and required from every token
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Audience claim written into and required from every token
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Lifetime of newly issued tokens
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_ttl")]
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: default_issuer(),
            audience: default_audience(),
            ttl: default_ttl(),
        }
    }
}

impl Validatable for TokenConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.issuer, "issuer", self.domain_name())?;
        validate_required_string(&self.audience, "audience", self.domain_name())?;

        if self.ttl.is_zero() {
            return Err(self.validation_error("ttl must be greater than 0"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "token"
    }
}

impl TokenConfig {
    /// Validate the configuration for a process that signs or verifies tokens.
    ///
    /// The secret is only mandatory once tokens are actually used, so it is
    /// not part of [`Validatable::validate`].
    pub fn validate_for_signing(&self) -> ConfigResult<()> {
        self.validate()?;
        validate_required_string(&self.secret, "secret", self.domain_name())
    }
}

fn default_issuer() -> String {
    "warden".to_string()
}

fn default_audience() -> String {
    "warden-clients".to_string()
}

fn default_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_token_config() {
        let config = TokenConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validate_for_signing().is_err());
        assert_eq!(config.ttl, Duration::from_secs(1800));
    }

    #[test]
    fn test_ttl_must_be_positive() {
        let mut config = TokenConfig {
            secret: "s3cret".to_string(),
            ttl: Duration::from_millis(500),
            ..Default::default()
        };
        assert!(config.validate_for_signing().is_ok());

        config.ttl = Duration::ZERO;
        let err = config.validate_for_signing().unwrap_err();
        assert!(err.to_string().contains("ttl must be greater than 0"));
    }
}
