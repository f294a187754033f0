use anyhow::Result;
use tracing_subscriber::EnvFilter;
use warden_config::{LogFormat, LoggingConfig};

/// Build the filter for a configuration
///
/// A non-empty, parseable `RUST_LOG` wins over the configured level and
/// directives. `info` is used when neither yields a filter.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(config.filter_directive()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Initialize logging from configuration.
///
/// Log lines go to stderr so command output on stdout stays machine readable.
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    // try_init so a second initialisation (tests, embedded use) is not fatal
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}
