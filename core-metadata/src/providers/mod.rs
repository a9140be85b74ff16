//! Catalog Providers
//!
//! Each external music database is wrapped in a [`CatalogProvider`]
//! implementation; [`CatalogLookup`] fans a query out to every configured
//! provider and isolates per-source failures so one catalog being down
//! never affects the others.

pub mod discogs;
pub mod musicbrainz;
pub(crate) mod rate_limit;

pub use discogs::DiscogsProvider;
pub use musicbrainz::MusicBrainzProvider;

use crate::error::Result;
use crate::extractor::ExtractedTags;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// External catalog identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    MusicBrainz,
    Discogs,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::MusicBrainz => "musicbrainz",
            CatalogSource::Discogs => "discogs",
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse artist/title/album triple driving a catalog query.
///
/// Missing fields degrade the query; they never abort it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackQuery {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl TrackQuery {
    pub fn from_tags(tags: &ExtractedTags) -> Self {
        Self {
            artist: tags.artist().map(str::to_string),
            title: tags.title().map(str::to_string),
            album: tags.album().map(str::to_string),
        }
    }

    /// True when no field carries a value; providers answer such a query
    /// with "no candidate" without issuing a request.
    pub fn is_blank(&self) -> bool {
        self.artist.is_none() && self.title.is_none() && self.album.is_none()
    }

    /// Combined free-text form for providers without fielded search.
    pub fn combined_text(&self) -> String {
        [
            self.artist.as_deref(),
            self.album.as_deref(),
            self.title.as_deref(),
        ]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Partial metadata returned by one catalog source.
///
/// Produced per lookup and embedded verbatim in the reconciliation
/// prompt; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogCandidate {
    pub source: CatalogSource,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub track_number: Option<String>,
    pub year: Option<String>,
}

/// Aggregated lookup result: one entry per configured source, `None`
/// where the source failed or had no match. An all-`None` map is valid
/// reconciler input, not an error.
pub type CatalogFindings = BTreeMap<CatalogSource, Option<CatalogCandidate>>;

/// One external catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    fn source(&self) -> CatalogSource;

    /// Search for the best candidate matching `query`.
    ///
    /// `Ok(None)` means the source answered but had no usable match.
    async fn search(&self, query: &TrackQuery) -> Result<Option<CatalogCandidate>>;
}

/// Fans one query out to every configured provider.
pub struct CatalogLookup {
    providers: Vec<Arc<dyn CatalogProvider>>,
}

impl CatalogLookup {
    pub fn new(providers: Vec<Arc<dyn CatalogProvider>>) -> Self {
        Self { providers }
    }

    /// Query all providers concurrently.
    ///
    /// Every per-source failure is logged and degrades to `None` for that
    /// source; it never propagates to the caller or the other sources.
    pub async fn lookup(&self, query: &TrackQuery) -> CatalogFindings {
        let searches = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let query = query.clone();
            async move {
                let source = provider.source();
                match provider.search(&query).await {
                    Ok(candidate) => {
                        debug!(source = %source, found = candidate.is_some(), "Catalog lookup finished");
                        (source, candidate)
                    }
                    Err(e) => {
                        warn!(source = %source, error = %e, "Catalog lookup failed; continuing without this source");
                        (source, None)
                    }
                }
            }
        });

        join_all(searches).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;

    fn candidate(source: CatalogSource) -> CatalogCandidate {
        CatalogCandidate {
            source,
            artist: Some("Artist X".to_string()),
            album: Some("Album Y".to_string()),
            title: Some("Song Z".to_string()),
            track_number: None,
            year: Some("1999".to_string()),
        }
    }

    #[test]
    fn test_query_from_tags() {
        let tags = ExtractedTags::from_pairs([("artist", "Artist X"), ("title", "Song Z")]);
        let query = TrackQuery::from_tags(&tags);

        assert_eq!(query.artist.as_deref(), Some("Artist X"));
        assert_eq!(query.title.as_deref(), Some("Song Z"));
        assert_eq!(query.album, None);
        assert!(!query.is_blank());
    }

    #[test]
    fn test_combined_text_skips_missing_fields() {
        let query = TrackQuery {
            artist: Some("Artist X".to_string()),
            title: Some("Song Z".to_string()),
            album: None,
        };
        assert_eq!(query.combined_text(), "Artist X Song Z");

        assert_eq!(TrackQuery::default().combined_text(), "");
        assert!(TrackQuery::default().is_blank());
    }

    #[tokio::test]
    async fn test_source_isolation() {
        // One failing provider must not affect the other's candidate.
        let mut failing = MockCatalogProvider::new();
        failing
            .expect_source()
            .return_const(CatalogSource::MusicBrainz);
        failing.expect_search().returning(|_| {
            Err(MetadataError::NetworkError("connection refused".to_string()))
        });

        let mut healthy = MockCatalogProvider::new();
        healthy.expect_source().return_const(CatalogSource::Discogs);
        healthy
            .expect_search()
            .returning(|_| Ok(Some(candidate(CatalogSource::Discogs))));

        let lookup = CatalogLookup::new(vec![Arc::new(failing), Arc::new(healthy)]);
        let findings = lookup.lookup(&TrackQuery::default()).await;

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[&CatalogSource::MusicBrainz], None);
        assert_eq!(
            findings[&CatalogSource::Discogs],
            Some(candidate(CatalogSource::Discogs))
        );
    }

    #[tokio::test]
    async fn test_all_sources_empty_is_valid() {
        let mut empty = MockCatalogProvider::new();
        empty
            .expect_source()
            .return_const(CatalogSource::MusicBrainz);
        empty.expect_search().returning(|_| Ok(None));

        let lookup = CatalogLookup::new(vec![Arc::new(empty)]);
        let findings = lookup.lookup(&TrackQuery::default()).await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[&CatalogSource::MusicBrainz], None);
    }

    #[tokio::test]
    async fn test_no_providers_yields_empty_findings() {
        let lookup = CatalogLookup::new(Vec::new());
        let findings = lookup.lookup(&TrackQuery::default()).await;
        assert!(findings.is_empty());
    }
}
