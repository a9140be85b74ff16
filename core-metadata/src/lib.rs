//! # Metadata Module
//!
//! Turns one audio file into a single reconciled metadata answer:
//! - Tag extraction from the audio container (ID3v2, Vorbis Comments,
//!   MP4 tags, FLAC)
//! - Candidate lookup against external catalogs (MusicBrainz, Discogs)
//!   with per-source failure isolation
//! - LLM-assisted reconciliation with shape validation and a bounded
//!   corrective retry

pub mod error;
pub mod extractor;
pub mod providers;
pub mod reconciler;

pub use error::{MetadataError, Result};
