//! `arrange` - organize an unsorted directory of audio files into a
//! canonically named and located library.
//!
//! Per file: read the embedded tags, look the track up in MusicBrainz
//! and Discogs, reconcile everything into one answer through a local
//! Ollama model, move the file to its canonical path under the output
//! root, and record completion in a SQLite progress database so repeated
//! runs over a partially processed directory never move a file twice.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use core_metadata::extractor::TagExtractor;
use core_metadata::providers::{
    CatalogLookup, CatalogProvider, DiscogsProvider, MusicBrainzProvider,
};
use core_metadata::reconciler::{MetadataReconciler, OllamaClient};
use core_organize::Organizer;
use core_runtime::config::{CatalogApiConfig, OrganizerConfig, ReconcilerConfig};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_store::db::{create_pool, DatabaseConfig};
use core_store::{ProgressStore, SqliteProgressStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Organize an unsorted directory of audio files into a canonical library.
#[derive(Debug, Parser)]
#[command(name = "arrange", version, about)]
struct Cli {
    /// Directory scanned recursively for audio files
    input_root: PathBuf,

    /// Directory the canonical library is built under
    output_root: PathBuf,

    /// Progress database path (default: <OUTPUT_ROOT>/arrangement.db)
    #[arg(long, env = "ARRANGE_DATABASE")]
    database: Option<PathBuf>,

    /// Number of files processed concurrently
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// User-Agent sent to the catalogs, "AppName/Version (Contact)"
    #[arg(long, env = "ARRANGE_USER_AGENT")]
    user_agent: Option<String>,

    /// Discogs personal access token; Discogs is skipped without it
    #[arg(long, env = "DISCOGS_TOKEN")]
    discogs_token: Option<String>,

    /// Ollama server base URL
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    ollama_host: String,

    /// Model used for metadata reconciliation
    #[arg(long, env = "ARRANGE_MODEL", default_value = "llama3.1")]
    model: String,

    /// Reconciliation requests allowed per file (first try + corrections)
    #[arg(long, default_value_t = 2)]
    reconcile_attempts: u32,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatArg,

    /// Log filter directive, e.g. "core_organize=debug,info"
    #[arg(long, env = "ARRANGE_LOG")]
    log_filter: Option<String>,
}

fn build_config(cli: &Cli) -> anyhow::Result<OrganizerConfig> {
    let mut catalog = CatalogApiConfig::default();
    if let Some(user_agent) = &cli.user_agent {
        catalog = catalog.with_user_agent(user_agent);
    }
    if let Some(token) = &cli.discogs_token {
        catalog = catalog.with_discogs_token(token);
    }

    let reconciler = ReconcilerConfig::default()
        .with_host(&cli.ollama_host)
        .with_model(&cli.model)
        .with_max_attempts(cli.reconcile_attempts);

    let mut builder = OrganizerConfig::builder()
        .input_root(&cli.input_root)
        .output_root(&cli.output_root)
        .worker_count(cli.workers)
        .catalog(catalog)
        .reconciler(reconciler);

    if let Some(database) = &cli.database {
        builder = builder.database_path(database);
    }

    builder.build().context("invalid configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default().with_format(cli.log_format.into());
    if let Some(filter) = &cli.log_filter {
        logging = logging.with_filter(filter);
    }
    init_logging(logging).context("failed to initialize logging")?;

    let config = build_config(&cli)?;

    tokio::fs::create_dir_all(&config.output_root)
        .await
        .with_context(|| format!("failed to create {}", config.output_root.display()))?;

    let pool = create_pool(DatabaseConfig::new(&config.database_path))
        .await
        .context("failed to open progress database")?;
    let store = Arc::new(SqliteProgressStore::new(pool));
    store
        .initialize()
        .await
        .context("failed to initialize progress store")?;

    let http = reqwest::Client::new();

    let mut providers: Vec<Arc<dyn CatalogProvider>> = vec![Arc::new(
        MusicBrainzProvider::from_config(http.clone(), &config.catalog),
    )];
    match DiscogsProvider::from_config(http.clone(), &config.catalog) {
        Some(discogs) => providers.push(Arc::new(discogs)),
        None => info!("No Discogs token configured; continuing with MusicBrainz only"),
    }

    let reconciler = MetadataReconciler::new(
        Arc::new(OllamaClient::from_config(http, &config.reconciler)),
        config.reconciler.max_attempts,
    );

    let organizer = Arc::new(Organizer::new(
        Arc::new(TagExtractor::new()),
        Arc::new(CatalogLookup::new(providers)),
        Arc::new(reconciler),
        store,
        &config.output_root,
        config.worker_count,
    ));

    let summary = organizer.run(&config.input_root).await?;

    println!(
        "Organized {} file(s), {} already in place, {} skipped (of {} discovered).",
        summary.organized, summary.already_organized, summary.skipped, summary.discovered
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_config_from_args() {
        let cli = Cli::parse_from([
            "arrange",
            "/music/incoming",
            "/music/library",
            "--workers",
            "8",
            "--discogs-token",
            "tok",
        ]);

        let config = build_config(&cli).unwrap();
        assert_eq!(config.input_root, PathBuf::from("/music/incoming"));
        assert_eq!(config.worker_count, 8);
        assert!(config.catalog.has_discogs());
        assert_eq!(
            config.database_path,
            PathBuf::from("/music/library/arrangement.db")
        );
    }

    #[test]
    fn test_invalid_worker_count_rejected() {
        let cli = Cli::parse_from(["arrange", "/in", "/out", "--workers", "0"]);
        assert!(build_config(&cli).is_err());
    }
}
