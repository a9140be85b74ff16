//! Metadata Reconciliation
//!
//! Collapses extracted tags and catalog findings into one structured
//! metadata answer via a generative-text collaborator.
//!
//! ## Contract
//!
//! The collaborator is asked for a JSON object with exactly four fields:
//! artist, album, track number and track name. A response is valid iff
//! all four are present and non-empty - a shape check only, no semantic
//! verification. An invalid response earns exactly one corrective
//! follow-up per remaining attempt; when the allowed attempts are
//! exhausted the reconciliation fails and no metadata is produced.
//!
//! The file extension is taken from the source path, never from the
//! collaborator.

use crate::error::{MetadataError, Result};
use crate::extractor::ExtractedTags;
use crate::providers::CatalogFindings;
use async_trait::async_trait;
use core_runtime::config::ReconcilerConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Generative-text collaborator.
///
/// Transport concerns (its own retries, timeouts) belong to the
/// implementation; the reconciler only issues its bounded corrective
/// follow-ups on shape-invalid answers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Ollama-backed completion client (`POST {host}/api/generate`).
pub struct OllamaClient {
    http: Client,
    host: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(
        http: Client,
        host: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            host: host.into(),
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(http: Client, config: &ReconcilerConfig) -> Self {
        Self::new(
            http,
            config.host.clone(),
            config.model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.host.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        debug!(model = %self.model, "Requesting completion from {}", url);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| MetadataError::NetworkError(format!("Completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse completion response: {}", e))
        })?;

        Ok(parsed.response)
    }
}

/// The single accepted structured answer for one file.
///
/// All four primary fields must be present for the reconciler to accept
/// a record; the optional representation lets downstream path building
/// defend against incomplete records anyway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledMetadata {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<String>,
    pub track_name: Option<String>,
    /// Taken from the source file path, not from the collaborator.
    pub extension: Option<String>,
}

impl ReconciledMetadata {
    /// Shape check only: all four requested fields are present.
    pub fn is_complete(&self) -> bool {
        self.artist.is_some()
            && self.album.is_some()
            && self.track_number.is_some()
            && self.track_name.is_some()
    }
}

/// Turns (tags, catalog findings) into one [`ReconciledMetadata`].
pub struct MetadataReconciler {
    client: Arc<dyn CompletionClient>,
    max_attempts: u32,
}

impl MetadataReconciler {
    /// Create a reconciler with a bounded number of attempts.
    ///
    /// `max_attempts` counts requests per file: the first attempt plus
    /// corrective follow-ups. At least one request is always made.
    pub fn new(client: Arc<dyn CompletionClient>, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reconcile one file's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::ReconciliationFailed`] when every allowed
    /// attempt produced a shape-invalid answer, and propagates transport
    /// errors from the collaborator unchanged.
    #[instrument(skip(self, tags, findings), fields(path = %path.display()))]
    pub async fn reconcile(
        &self,
        path: &Path,
        tags: &ExtractedTags,
        findings: &CatalogFindings,
    ) -> Result<ReconciledMetadata> {
        let mut prompt = self.primary_prompt(path, tags, findings);

        for attempt in 1..=self.max_attempts {
            let response = self.client.complete(&prompt).await?;

            match Self::parse_response(&response) {
                Some(mut metadata) => {
                    debug!(attempt, "Reconciliation response accepted");
                    metadata.extension = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.to_ascii_lowercase());
                    return Ok(metadata);
                }
                None => {
                    warn!(attempt, "Reconciliation response failed shape validation");
                    prompt = self.corrective_prompt(path);
                }
            }
        }

        Err(MetadataError::ReconciliationFailed {
            attempts: self.max_attempts,
        })
    }

    fn primary_prompt(
        &self,
        path: &Path,
        tags: &ExtractedTags,
        findings: &CatalogFindings,
    ) -> String {
        let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "{}".to_string());
        let findings_json =
            serde_json::to_string_pretty(findings).unwrap_or_else(|_| "{}".to_string());

        format!(
            "We have a music file located at '{}' with the following extracted tags:\n\
             {}\n\n\
             External catalog lookups (MusicBrainz, Discogs) returned these candidates \
             (null means the source had no answer):\n\
             {}\n\n\
             Help organize this file by confirming the correct information or suggesting \
             better alternatives, preferring values corroborated by the catalog data. \
             Reply with a single JSON object containing exactly these fields:\n\
             \"artist\", \"album\", \"track_number\", \"track_name\"\n\
             Keep the answer consistent and avoid fabricating details; if you are \
             uncertain, choose the most plausible value supported by the data above.",
            path.display(),
            tags_json,
            findings_json
        )
    }

    fn corrective_prompt(&self, path: &Path) -> String {
        format!(
            "The answer provided for the file '{}' was incomplete or inconsistent. \
             Reply again with a single well-formed JSON object containing non-empty \
             \"artist\", \"album\", \"track_number\" and \"track_name\" fields, \
             consistent with the data already provided and free of fabricated \
             information.",
            path.display()
        )
    }

    /// Shape validation: the response must be a JSON object carrying
    /// non-absent values for all four fields. No semantic checks.
    fn parse_response(text: &str) -> Option<ReconciledMetadata> {
        let value: Value = serde_json::from_str(text.trim()).ok()?;
        let object = value.as_object()?;

        let metadata = ReconciledMetadata {
            artist: field_text(object, "artist"),
            album: field_text(object, "album"),
            track_number: field_text(object, "track_number"),
            track_name: field_text(object, "track_name"),
            extension: None,
        };

        metadata.is_complete().then_some(metadata)
    }
}

/// A field counts as present when it is a non-empty string or a number;
/// numbers are rendered as their decimal text.
fn field_text(object: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    match object.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of completions and counts requests.
    struct CannedClient {
        responses: Mutex<Vec<String>>,
        calls: AtomicU32,
    }

    impl CannedClient {
        fn new(responses: &[&str]) -> Self {
            let mut queue: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
            queue.reverse();
            Self {
                responses: Mutex::new(queue),
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            responses
                .pop()
                .ok_or_else(|| MetadataError::NetworkError("no canned response left".to_string()))
        }
    }

    const VALID: &str = r#"{"artist": "Artist X", "album": "Album Y",
                            "track_number": "03", "track_name": "Song Z"}"#;

    fn reconciler(client: CannedClient) -> (Arc<CannedClient>, MetadataReconciler) {
        let client = Arc::new(client);
        let shared: Arc<dyn CompletionClient> = client.clone();
        let reconciler = MetadataReconciler::new(shared, 2);
        (client, reconciler)
    }

    #[test]
    fn test_parse_valid_response() {
        let metadata = MetadataReconciler::parse_response(VALID).unwrap();
        assert_eq!(metadata.artist.as_deref(), Some("Artist X"));
        assert_eq!(metadata.track_number.as_deref(), Some("03"));
        assert!(metadata.is_complete());
    }

    #[test]
    fn test_missing_track_number_rejected() {
        // All other fields being present does not make the shape valid.
        let response = r#"{"artist": "A", "album": "B", "track_name": "C"}"#;
        assert!(MetadataReconciler::parse_response(response).is_none());
    }

    #[test]
    fn test_empty_field_rejected() {
        let response = r#"{"artist": "A", "album": "", "track_number": "1", "track_name": "C"}"#;
        assert!(MetadataReconciler::parse_response(response).is_none());
    }

    #[test]
    fn test_numeric_track_number_accepted() {
        let response = r#"{"artist": "A", "album": "B", "track_number": 7, "track_name": "C"}"#;
        let metadata = MetadataReconciler::parse_response(response).unwrap();
        assert_eq!(metadata.track_number.as_deref(), Some("7"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(MetadataReconciler::parse_response("not json at all").is_none());
        assert!(MetadataReconciler::parse_response(r#"["artist"]"#).is_none());
    }

    #[tokio::test]
    async fn test_valid_first_answer_makes_one_request() {
        let (client, reconciler) = reconciler(CannedClient::new(&[VALID]));

        let metadata = reconciler
            .reconcile(
                Path::new("/in/song.FLAC"),
                &ExtractedTags::default(),
                &CatalogFindings::new(),
            )
            .await
            .unwrap();

        assert_eq!(client.call_count(), 1);
        assert_eq!(metadata.extension.as_deref(), Some("flac"));
    }

    #[tokio::test]
    async fn test_corrective_retry_recovers() {
        let (client, reconciler) = reconciler(CannedClient::new(&["{}", VALID]));

        let metadata = reconciler
            .reconcile(
                Path::new("/in/song.mp3"),
                &ExtractedTags::default(),
                &CatalogFindings::new(),
            )
            .await
            .unwrap();

        assert_eq!(client.call_count(), 2);
        assert_eq!(metadata.artist.as_deref(), Some("Artist X"));
    }

    #[tokio::test]
    async fn test_bounded_retry_fails_after_two_invalid_answers() {
        let (client, reconciler) = reconciler(CannedClient::new(&["{}", "still not valid"]));

        let result = reconciler
            .reconcile(
                Path::new("/in/song.mp3"),
                &ExtractedTags::default(),
                &CatalogFindings::new(),
            )
            .await;

        assert_eq!(client.call_count(), 2);
        match result {
            Err(MetadataError::ReconciliationFailed { attempts }) => assert_eq!(attempts, 2),
            other => panic!("expected ReconciliationFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        // An exhausted canned queue doubles as a transport failure.
        let (client, reconciler) = reconciler(CannedClient::new(&[]));

        let result = reconciler
            .reconcile(
                Path::new("/in/song.mp3"),
                &ExtractedTags::default(),
                &CatalogFindings::new(),
            )
            .await;

        assert_eq!(client.call_count(), 1);
        assert!(matches!(result, Err(MetadataError::NetworkError(_))));
    }
}
