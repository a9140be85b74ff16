//! Audio Tag Extraction
//!
//! Reads embedded tags from audio files using the `lofty` crate. It
//! supports ID3v2, Vorbis Comments, MP4 tags, and FLAC.
//!
//! ## Overview
//!
//! - Collects the textual tags relevant to organizing (artist, title,
//!   album, track number, ...) into a name -> value map
//! - Normalizes values (trim whitespace, drop control characters)
//! - Signals an extraction error for unreadable files and files without
//!   a tag container, so the caller can skip them without writing any
//!   progress
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::{TagExtractor, TagSource};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = TagExtractor::new();
//! let tags = extractor.extract(Path::new("song.mp3")).await?;
//!
//! println!("Artist: {}", tags.artist().unwrap_or("<untagged>"));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use lofty::config::ParseOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{MetadataError, Result};

/// Tags extracted from one audio file.
///
/// Values are normalized text keyed by a stable lowercase tag name
/// (`"artist"`, `"title"`, ...). The map may be empty when the container
/// carries no recognized frames; that is a degraded input for the
/// pipeline, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedTags {
    values: BTreeMap<String, String>,
}

impl ExtractedTags {
    /// Build a tag map from name/value pairs. Intended for tests and
    /// callers that already hold decoded tags.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn artist(&self) -> Option<&str> {
        self.get("artist")
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn album(&self) -> Option<&str> {
        self.get("album")
    }

    pub fn track_number(&self) -> Option<&str> {
        self.get("track")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, name: &str, value: String) {
        if !value.is_empty() {
            self.values.insert(name.to_string(), value);
        }
    }
}

/// Source of extracted tags.
///
/// The organizer depends on this seam instead of the concrete reader so
/// tests can substitute canned tags for real audio files.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Read the embedded tags of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::ExtractionFailed`] when the file cannot
    /// be read, has no tag container, or its container cannot be decoded.
    /// The caller must treat this as "skip this file, write no progress".
    async fn extract(&self, path: &Path) -> Result<ExtractedTags>;
}

/// `lofty`-backed tag reader.
pub struct TagExtractor {
    /// Parse options for lofty
    parse_options: ParseOptions,
}

impl TagExtractor {
    /// Create a new tag extractor with default settings
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Create an extractor with custom parse options
    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }

    /// Normalize a tag value
    ///
    /// - Trims leading/trailing whitespace
    /// - Collapses consecutive whitespace to single spaces
    /// - Removes null bytes and control characters
    fn normalize_text(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .filter(|c| !c.is_control())
            .collect()
    }

    fn collect_tags(tag: &lofty::tag::Tag) -> ExtractedTags {
        let mut tags = ExtractedTags::default();

        if let Some(v) = tag.artist() {
            tags.insert("artist", Self::normalize_text(v.as_ref()));
        }
        if let Some(v) = tag.title() {
            tags.insert("title", Self::normalize_text(v.as_ref()));
        }
        if let Some(v) = tag.album() {
            tags.insert("album", Self::normalize_text(v.as_ref()));
        }
        if let Some(v) = tag.get_string(&ItemKey::AlbumArtist) {
            tags.insert("album_artist", Self::normalize_text(v));
        }
        if let Some(n) = tag.track() {
            tags.insert("track", n.to_string());
        }
        if let Some(n) = tag.track_total() {
            tags.insert("track_total", n.to_string());
        }
        if let Some(n) = tag.disk() {
            tags.insert("disc", n.to_string());
        }
        if let Some(y) = tag.year() {
            tags.insert("year", y.to_string());
        }
        if let Some(v) = tag.genre() {
            tags.insert("genre", Self::normalize_text(v.as_ref()));
        }
        if let Some(v) = tag.get_string(&ItemKey::Composer) {
            tags.insert("composer", Self::normalize_text(v));
        }
        if let Some(v) = tag.comment() {
            tags.insert("comment", Self::normalize_text(v.as_ref()));
        }

        tags
    }
}

#[async_trait]
impl TagSource for TagExtractor {
    async fn extract(&self, path: &Path) -> Result<ExtractedTags> {
        debug!("Extracting tags from: {}", path.display());

        let file_data = fs::read(path)
            .await
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to read file: {}", e)))?;

        let tagged_file = Probe::new(std::io::Cursor::new(&file_data))
            .options(self.parse_options)
            .guess_file_type()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to probe file: {}", e)))?
            .read()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to parse file: {}", e)))?;

        let tag = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .ok_or_else(|| {
                MetadataError::ExtractionFailed(format!(
                    "No tag container in {}",
                    path.display()
                ))
            })?;

        Ok(Self::collect_tags(tag))
    }
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            TagExtractor::normalize_text("  Hello   World  "),
            "Hello World"
        );
        assert_eq!(
            TagExtractor::normalize_text("Title\nWith\tWhitespace"),
            "Title With Whitespace"
        );
        assert_eq!(TagExtractor::normalize_text("Clean Text"), "Clean Text");
    }

    #[test]
    fn test_from_pairs_accessors() {
        let tags = ExtractedTags::from_pairs([
            ("artist", "Artist X"),
            ("title", "Song Z"),
            ("track", "3"),
        ]);

        assert_eq!(tags.artist(), Some("Artist X"));
        assert_eq!(tags.title(), Some("Song Z"));
        assert_eq!(tags.track_number(), Some("3"));
        assert_eq!(tags.album(), None);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_empty_map() {
        let tags = ExtractedTags::default();
        assert!(tags.is_empty());
        assert_eq!(tags.get("artist"), None);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let tags = ExtractedTags::from_pairs([("artist", "Artist X")]);
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"{"artist":"Artist X"}"#);
    }

    #[test]
    fn test_empty_values_dropped_on_insert() {
        let mut tags = ExtractedTags::default();
        tags.insert("comment", String::new());
        assert!(tags.is_empty());
    }
}
