//! Logging configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default)]
    pub level: LogLevel,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,

    /// Extra `EnvFilter` directives, e.g. `sqlx=warn`
    #[serde(default)]
    pub directives: Vec<String>,

    /// Whether to include source location in logs
    #[serde(default = "crate::domains::utils::default_false")]
    pub include_location: bool,
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Log format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            directives: Vec::new(),
            include_location: false,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(level)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl LoggingConfig {
    /// Filter string combining the base level with extra directives
    pub fn filter_directive(&self) -> String {
        std::iter::once(self.level.to_string())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(empty) = self.directives.iter().position(|d| d.trim().is_empty()) {
            return Err(self.validation_error(format!("directives[{}] cannot be empty", empty)));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "logging"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_filter_directive() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            directives: vec!["sqlx=warn".to_string(), "sea_orm=info".to_string()],
            ..Default::default()
        };
        assert_eq!(config.filter_directive(), "debug,sqlx=warn,sea_orm=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_directive_rejected() {
        let config = LoggingConfig {
            directives: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
