//! # Logging & Tracing Bootstrap
//!
//! Configures the `tracing-subscriber` stack used by the `arrange`
//! binary: pretty output for interactive runs, compact or JSON for
//! scripted ones, and `EnvFilter`-style module filtering compatible with
//! `RUST_LOG` directives.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_filter("core_organize=debug,info");
//! init_logging(config)?;
//!
//! tracing::info!("Organizer started");
//! ```

use crate::error::{Error, Result};
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Compact single-line format for production
    Compact,
    /// Structured JSON format for machine parsing
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format for the fmt layer
    pub format: LogFormat,
    /// Filter directive, e.g. `"info"` or `"core_organize=debug,info"`.
    /// When absent, `RUST_LOG` is consulted and `"info"` is the fallback.
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Install the global tracing subscriber.
///
/// Returns an error if the filter directive cannot be parsed or a
/// subscriber is already installed for this process.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = match &config.filter {
        Some(directive) => EnvFilter::try_new(directive).map_err(|e| {
            Error::Config(format!("Invalid log filter '{}': {}", directive, e))
        })?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_filter("debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LoggingConfig::default().with_filter("not==a==directive");
        let result = init_logging(config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log filter"));
    }
}
