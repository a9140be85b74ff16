//! MusicBrainz Catalog Provider
//!
//! Recording search against the MusicBrainz web service.
//!
//! ## API Endpoint
//!
//! - **Search**: `https://musicbrainz.org/ws/2/recording/?query={query}&fmt=json`
//!
//! ## Rate Limiting
//!
//! MusicBrainz allows 1 request/second for identified clients; the
//! provider enforces that delay itself.
//!
//! ## User Agent Requirement
//!
//! MusicBrainz requires all API clients to identify themselves with a
//! User-Agent of the form "ApplicationName/Version (Contact)".

use crate::error::{MetadataError, Result};
use crate::providers::rate_limit::RateLimiter;
use crate::providers::{CatalogCandidate, CatalogProvider, CatalogSource, TrackQuery};
use async_trait::async_trait;
use core_runtime::config::CatalogApiConfig;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// MusicBrainz API base URL
const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

/// Maximum number of search results to retrieve
const MAX_SEARCH_RESULTS: u32 = 5;

/// Timeout for API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// MusicBrainz recording search client.
pub struct MusicBrainzProvider {
    http: Client,
    user_agent: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistCredit {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Release {
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Recording {
    title: String,
    #[serde(default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<Release>,
    #[serde(default)]
    first_release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordingSearchResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

impl MusicBrainzProvider {
    /// Creates a new MusicBrainz provider.
    ///
    /// # Arguments
    ///
    /// * `http` - shared HTTP client
    /// * `user_agent` - identity string ("AppName/Version (Contact)")
    /// * `rate_limit_delay_ms` - minimum delay between requests
    pub fn new(http: Client, user_agent: impl Into<String>, rate_limit_delay_ms: u64) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(rate_limit_delay_ms))),
        }
    }

    pub fn from_config(http: Client, config: &CatalogApiConfig) -> Self {
        Self::new(http, config.user_agent.clone(), config.rate_limit_delay_ms)
    }

    /// Build the Lucene query from whichever fields the tags provided.
    /// Returns `None` when no field carries a value.
    fn build_query(query: &TrackQuery) -> Option<String> {
        let mut clauses = Vec::new();

        if let Some(artist) = query.artist.as_deref() {
            clauses.push(format!("artist:\"{}\"", escape_query(artist)));
        }
        if let Some(title) = query.title.as_deref() {
            clauses.push(format!("recording:\"{}\"", escape_query(title)));
        }
        if let Some(album) = query.album.as_deref() {
            clauses.push(format!("release:\"{}\"", escape_query(album)));
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }

    fn candidate_from(recording: Recording) -> CatalogCandidate {
        let artist = recording.artist_credit.first().map(|c| c.name.clone());
        let album = recording.releases.first().map(|r| r.title.clone());
        let year = recording
            .first_release_date
            .as_deref()
            .and_then(|d| d.get(0..4))
            .map(str::to_string);

        CatalogCandidate {
            source: CatalogSource::MusicBrainz,
            artist,
            album,
            title: Some(recording.title),
            track_number: None,
            year,
        }
    }
}

#[async_trait]
impl CatalogProvider for MusicBrainzProvider {
    fn source(&self) -> CatalogSource {
        CatalogSource::MusicBrainz
    }

    async fn search(&self, query: &TrackQuery) -> Result<Option<CatalogCandidate>> {
        let lucene = match Self::build_query(query) {
            Some(q) => q,
            None => {
                debug!("No usable tag fields for a MusicBrainz query");
                return Ok(None);
            }
        };

        let url = format!(
            "{}/recording/?query={}&fmt=json&limit={}",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(&lucene),
            MAX_SEARCH_RESULTS
        );

        debug!("Searching MusicBrainz: {}", url);

        self.rate_limiter.lock().await.wait_if_needed().await;

        let response = self
            .http
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| MetadataError::NetworkError(format!("MusicBrainz search failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 503 {
                // Service unavailable - rate limited or maintenance
                warn!("MusicBrainz service unavailable (503)");
                return Ok(None);
            }

            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);

                return Err(MetadataError::RateLimited {
                    provider: "MusicBrainz".to_string(),
                    retry_after_seconds: retry_after,
                });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let search_result: RecordingSearchResponse = response.json().await.map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse search results: {}", e))
        })?;

        Ok(search_result
            .recordings
            .into_iter()
            .next()
            .map(Self::candidate_from))
    }
}

/// Escapes special characters in Lucene query syntax
fn escape_query(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('+', "\\+")
        .replace('-', "\\-")
        .replace('!', "\\!")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('[', "\\[")
        .replace(']', "\\]")
        .replace('^', "\\^")
        .replace('~', "\\~")
        .replace('*', "\\*")
        .replace('?', "\\?")
        .replace(':', "\\:")
        .replace('/', "\\/")
        .replace('.', "\\.")
}
