//! Discogs Catalog Provider
//!
//! Combined-text release search against the Discogs database API.
//!
//! ## API Endpoint
//!
//! - **Search**: `https://api.discogs.com/database/search?q={text}&type=release&token={token}`
//!
//! ## Authentication
//!
//! Discogs requires a personal access token for database searches.
//! Without one the provider is simply not configured; a run with
//! MusicBrainz alone is valid.

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
use tracing::debug;

/// Discogs API base URL
const DISCOGS_API_BASE: &str = "https://api.discogs.com";

/// Timeout for API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Discogs release search client.
pub struct DiscogsProvider {
    http: Client,
    token: String,
    user_agent: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

/// One release search result. Discogs renders the release as a single
/// "Artist - Title" string.
#[derive(Debug, Clone, Deserialize)]
struct SearchResult {
    title: String,
    #[serde(default)]
    year: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

impl DiscogsProvider {
    /// Creates a new Discogs provider.
    pub fn new(
        http: Client,
        token: impl Into<String>,
        user_agent: impl Into<String>,
        rate_limit_delay_ms: u64,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            user_agent: user_agent.into(),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(rate_limit_delay_ms))),
        }
    }

    /// Builds a provider from the catalog configuration, `None` when no
    /// token is configured.
    pub fn from_config(http: Client, config: &CatalogApiConfig) -> Option<Self> {
        config.discogs_token.as_ref().map(|token| {
            Self::new(
                http,
                token.clone(),
                config.user_agent.clone(),
                config.rate_limit_delay_ms,
            )
        })
    }

    /// Split a Discogs "Artist - Release" title into its halves.
    fn split_release_title(title: &str) -> (Option<String>, Option<String>) {
        match title.split_once(" - ") {
            Some((artist, release)) => (
                Some(artist.trim().to_string()),
                Some(release.trim().to_string()),
            ),
            None => (None, Some(title.trim().to_string())),
        }
    }

    fn candidate_from(result: SearchResult) -> CatalogCandidate {
        let (artist, album) = Self::split_release_title(&result.title);

        CatalogCandidate {
            source: CatalogSource::Discogs,
            artist,
            album,
            title: None,
            track_number: None,
            year: result.year,
        }
    }
}

#[async_trait]
impl CatalogProvider for DiscogsProvider {
    fn source(&self) -> CatalogSource {
        CatalogSource::Discogs
    }

    async fn search(&self, query: &TrackQuery) -> Result<Option<CatalogCandidate>> {
        let text = query.combined_text();
        if text.is_empty() {
            debug!("No usable tag fields for a Discogs query");
            return Ok(None);
        }

        let url = format!(
            "{}/database/search?q={}&type=release&token={}",
            DISCOGS_API_BASE,
            urlencoding::encode(&text),
            urlencoding::encode(&self.token)
        );

        debug!("Searching Discogs for '{}'", text);

        self.rate_limiter.lock().await.wait_if_needed().await;

        let response = self
            .http
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| MetadataError::NetworkError(format!("Discogs search failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);

                return Err(MetadataError::RateLimited {
                    provider: "Discogs".to_string(),
                    retry_after_seconds: retry_after,
                });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let search_result: SearchResponse = response.json().await.map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse search results: {}", e))
        })?;

        Ok(search_result
            .results
            .into_iter()
            .next()
            .map(Self::candidate_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_release_title() {
        assert_eq!(
            DiscogsProvider::split_release_title("Artist X - Album Y"),
            (Some("Artist X".to_string()), Some("Album Y".to_string()))
        );
        assert_eq!(
            DiscogsProvider::split_release_title("Untitled"),
            (None, Some("Untitled".to_string()))
        );
    }

    #[test]
    fn test_candidate_from_result() {
        let candidate = DiscogsProvider::candidate_from(SearchResult {
            title: "Artist X - Album Y".to_string(),
            year: Some("1999".to_string()),
        });

        assert_eq!(candidate.source, CatalogSource::Discogs);
        assert_eq!(candidate.artist.as_deref(), Some("Artist X"));
        assert_eq!(candidate.album.as_deref(), Some("Album Y"));
        assert_eq!(candidate.title, None);
        assert_eq!(candidate.year.as_deref(), Some("1999"));
    }

    #[tokio::test]
    async fn test_blank_query_short_circuits() {
        let provider = DiscogsProvider::new(Client::new(), "token", "Test/1.0 (test)", 1000);
        let result = provider.search(&TrackQuery::default()).await.unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = CatalogApiConfig::default();
        assert!(DiscogsProvider::from_config(Client::new(), &config).is_none());

        let config = config.with_discogs_token("tok");
        assert!(DiscogsProvider::from_config(Client::new(), &config).is_some());
    }

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{"results": [{"title": "Artist X - Album Y", "year": "1999"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].year.as_deref(), Some("1999"));
    }
}
