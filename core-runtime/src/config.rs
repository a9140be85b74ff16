//! # Organizer Configuration
//!
//! Configuration for an organizing run, constructed through a builder
//! with fail-fast validation so a misconfigured run aborts before any
//! file is touched.
//!
//! ## Required values
//!
//! - `input_root` - directory scanned for audio files
//! - `output_root` - directory the canonical library is built under
//!
//! ## Optional values (with defaults)
//!
//! - `database_path` - progress database (default: under the output root)
//! - `worker_count` - bounded worker pool size
//! - [`CatalogApiConfig`] - external catalog identity and pacing
//! - [`ReconcilerConfig`] - generative-text collaborator endpoint
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::OrganizerConfig;
//!
//! let config = OrganizerConfig::builder()
//!     .input_root("/music/incoming")
//!     .output_root("/music/library")
//!     .worker_count(8)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Default SQLite database file name, created under the output root.
pub const DEFAULT_DATABASE_FILE: &str = "arrangement.db";

/// Default number of files processed concurrently.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Configuration for one organizing run.
///
/// Use [`OrganizerConfig::builder`] to construct instances.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    /// Directory scanned recursively for audio files
    pub input_root: PathBuf,

    /// Directory canonical target paths are rooted under
    pub output_root: PathBuf,

    /// Path to the SQLite progress database
    pub database_path: PathBuf,

    /// Number of files processed concurrently
    pub worker_count: usize,

    /// External catalog configuration (MusicBrainz, Discogs)
    pub catalog: CatalogApiConfig,

    /// Generative-text reconciliation configuration
    pub reconciler: ReconcilerConfig,
}

/// Configuration for the external catalog services.
///
/// MusicBrainz requires every client to identify itself with a
/// `User-Agent` of the form `"AppName/Version (Contact)"` and expects at
/// most one request per second from identified clients; the same identity
/// and pacing are applied to Discogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogApiConfig {
    /// User agent sent with every catalog request
    /// (format: `"AppName/Version (Contact)"`)
    pub user_agent: String,

    /// Discogs personal access token. Without one the Discogs source is
    /// not queried; a single-catalog run is valid.
    pub discogs_token: Option<String>,

    /// Minimum delay between requests to one catalog, in milliseconds
    pub rate_limit_delay_ms: u64,
}

impl Default for CatalogApiConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Arrangement/{} (https://example.org/arrangement)",
                env!("CARGO_PKG_VERSION")
            ),
            discogs_token: None,
            rate_limit_delay_ms: 1000,
        }
    }
}

impl CatalogApiConfig {
    /// Sets the catalog user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the Discogs personal access token
    pub fn with_discogs_token(mut self, token: impl Into<String>) -> Self {
        self.discogs_token = Some(token.into());
        self
    }

    /// Sets the minimum delay between catalog requests
    pub fn with_rate_limit_delay_ms(mut self, delay_ms: u64) -> Self {
        self.rate_limit_delay_ms = delay_ms;
        self
    }

    /// Checks if Discogs is configured
    pub fn has_discogs(&self) -> bool {
        self.discogs_token.is_some()
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.is_empty() {
            return Err(Error::Config("Catalog user agent cannot be empty".to_string()));
        }
        if !self.user_agent.contains('/')
            || !self.user_agent.contains('(')
            || !self.user_agent.contains(')')
        {
            return Err(Error::Config(
                "Catalog user agent must follow format: 'AppName/Version (Contact)'".to_string(),
            ));
        }

        if self.rate_limit_delay_ms == 0 {
            return Err(Error::Config(
                "Rate limit delay must be greater than 0ms".to_string(),
            ));
        }
        if self.rate_limit_delay_ms > 60_000 {
            return Err(Error::Config(
                "Rate limit delay exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for the generative-text reconciliation collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Base URL of the Ollama server
    pub host: String,

    /// Model used for reconciliation requests
    pub model: String,

    /// Timeout applied to each reconciliation request, in seconds
    pub request_timeout_secs: u64,

    /// Requests allowed per file: the first attempt plus corrective
    /// follow-ups. 2 means "validate, refine once".
    pub max_attempts: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            request_timeout_secs: 120,
            max_attempts: 2,
        }
    }
}

impl ReconcilerConfig {
    /// Sets the Ollama server base URL
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the reconciliation model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the per-request timeout in seconds
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Sets the bounded attempt count
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return Err(Error::Config(format!(
                "Reconciler host must be an http(s) URL, got '{}'",
                self.host
            )));
        }
        if self.model.is_empty() {
            return Err(Error::Config("Reconciler model cannot be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "Reconciler request timeout must be greater than 0 seconds".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "Reconciler must be allowed at least 1 attempt".to_string(),
            ));
        }
        if self.max_attempts > 5 {
            return Err(Error::Config(
                "Reconciler attempt count exceeds maximum of 5".to_string(),
            ));
        }

        Ok(())
    }
}

impl OrganizerConfig {
    /// Creates a new builder for constructing an `OrganizerConfig`.
    pub fn builder() -> OrganizerConfigBuilder {
        OrganizerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.input_root.as_os_str().is_empty() {
            return Err(Error::Config("Input root cannot be empty".to_string()));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(Error::Config("Output root cannot be empty".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.worker_count == 0 {
            return Err(Error::Config(
                "Worker count must be greater than 0".to_string(),
            ));
        }
        if self.worker_count > 64 {
            return Err(Error::Config(
                "Worker count exceeds maximum of 64".to_string(),
            ));
        }

        self.catalog.validate()?;
        self.reconciler.validate()?;

        Ok(())
    }
}

/// Builder for constructing [`OrganizerConfig`] instances.
#[derive(Default)]
pub struct OrganizerConfigBuilder {
    input_root: Option<PathBuf>,
    output_root: Option<PathBuf>,
    database_path: Option<PathBuf>,
    worker_count: Option<usize>,
    catalog: CatalogApiConfig,
    reconciler: ReconcilerConfig,
}

impl OrganizerConfigBuilder {
    /// Sets the directory scanned for audio files (required).
    pub fn input_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.input_root = Some(path.into());
        self
    }

    /// Sets the directory target paths are rooted under (required).
    ///
    /// The legacy interface accepted an output directory it never used;
    /// here it is a required value with defined semantics.
    pub fn output_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_root = Some(path.into());
        self
    }

    /// Sets the progress database path.
    ///
    /// Default: [`DEFAULT_DATABASE_FILE`] under the output root.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the worker pool size. Default: [`DEFAULT_WORKER_COUNT`].
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Sets the catalog configuration.
    pub fn catalog(mut self, catalog: CatalogApiConfig) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the reconciler configuration.
    pub fn reconciler(mut self, reconciler: ReconcilerConfig) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Builds the final `OrganizerConfig` instance.
    ///
    /// Validates required values and returns an actionable error when
    /// anything is missing or out of range.
    pub fn build(self) -> Result<OrganizerConfig> {
        let input_root = self.input_root.ok_or_else(|| {
            Error::Config("Input root is required. Use .input_root() to set it.".to_string())
        })?;

        let output_root = self.output_root.ok_or_else(|| {
            Error::Config("Output root is required. Use .output_root() to set it.".to_string())
        })?;

        let database_path = self
            .database_path
            .unwrap_or_else(|| output_root.join(DEFAULT_DATABASE_FILE));

        let config = OrganizerConfig {
            input_root,
            output_root,
            database_path,
            worker_count: self.worker_count.unwrap_or(DEFAULT_WORKER_COUNT),
            catalog: self.catalog,
            reconciler: self.reconciler,
        };

        config.validate()?;

        Ok(config)
    }
}
