//! Integration tests for tag extraction
//!
//! These verify the error contract for files the extractor must refuse:
//! unreadable paths and data without a parsable tag container. Both must
//! surface as extraction errors so the organizer skips the file without
//! writing progress.

use core_metadata::extractor::{TagExtractor, TagSource};
use core_metadata::MetadataError;
use std::fs;
use std::path::PathBuf;

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("core-metadata-extraction-tests");
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

#[tokio::test]
async fn test_extract_missing_file() {
    let missing_path = scratch_dir().join("nonexistent.mp3");

    let extractor = TagExtractor::new();
    let result = extractor.extract(&missing_path).await;

    assert!(result.is_err(), "Should fail for missing file");
    assert!(matches!(
        result.unwrap_err(),
        MetadataError::ExtractionFailed(_)
    ));
}

#[tokio::test]
async fn test_extract_corrupted_file() {
    let corrupt_path = scratch_dir().join("corrupt.mp3");
    fs::write(&corrupt_path, b"This is not a valid audio file")
        .expect("Failed to create corrupt file");

    let extractor = TagExtractor::new();
    let result = extractor.extract(&corrupt_path).await;

    let _ = fs::remove_file(&corrupt_path);

    assert!(result.is_err(), "Should fail for corrupted file");
    assert!(matches!(
        result.unwrap_err(),
        MetadataError::ExtractionFailed(_)
    ));
}
