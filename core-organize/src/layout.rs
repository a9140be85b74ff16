//! Canonical library layout
//!
//! Pure mapping from reconciled metadata to the relative target path.
//! Identical metadata always maps to the same path; collisions between
//! distinct files are not resolved here (the organizer refuses the
//! second move). No filename sanitization is performed.

use core_metadata::reconciler::ReconciledMetadata;
use std::path::PathBuf;

// Substitutes applied when a field is absent. Fields are only absent
// when a caller bypasses the reconciler's validity contract, but the
// layout stays total anyway.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TRACK_NUMBER: &str = "01";
pub const UNKNOWN_TRACK_NAME: &str = "Unknown Track";
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Relative target path for one reconciled file:
/// `{artist}/{album}/{artist} - {album} - {track_number} - {track_name}.{extension}`
pub fn target_path(metadata: &ReconciledMetadata) -> PathBuf {
    let artist = metadata.artist.as_deref().unwrap_or(UNKNOWN_ARTIST);
    let album = metadata.album.as_deref().unwrap_or(UNKNOWN_ALBUM);
    let track_number = metadata.track_number.as_deref().unwrap_or(UNKNOWN_TRACK_NUMBER);
    let track_name = metadata.track_name.as_deref().unwrap_or(UNKNOWN_TRACK_NAME);
    let extension = metadata.extension.as_deref().unwrap_or(DEFAULT_EXTENSION);

    PathBuf::from(artist).join(album).join(format!(
        "{} - {} - {} - {}.{}",
        artist, album, track_number, track_name, extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_metadata() -> ReconciledMetadata {
        ReconciledMetadata {
            artist: Some("Artist X".to_string()),
            album: Some("Album Y".to_string()),
            track_number: Some("03".to_string()),
            track_name: Some("Song Z".to_string()),
            extension: Some("mp3".to_string()),
        }
    }

    #[test]
    fn test_full_metadata_path() {
        assert_eq!(
            target_path(&full_metadata()),
            PathBuf::from("Artist X/Album Y/Artist X - Album Y - 03 - Song Z.mp3")
        );
    }

    #[test]
    fn test_deterministic() {
        let metadata = full_metadata();
        assert_eq!(target_path(&metadata), target_path(&metadata));
    }

    #[test]
    fn test_default_substitution() {
        let metadata = ReconciledMetadata {
            artist: Some("Artist X".to_string()),
            track_name: Some("Song Z".to_string()),
            ..Default::default()
        };

        assert_eq!(
            target_path(&metadata),
            PathBuf::from("Artist X/Unknown Album/Artist X - Unknown Album - 01 - Song Z.mp3")
        );
    }

    #[test]
    fn test_all_fields_absent() {
        assert_eq!(
            target_path(&ReconciledMetadata::default()),
            PathBuf::from(
                "Unknown Artist/Unknown Album/Unknown Artist - Unknown Album - 01 - Unknown Track.mp3"
            )
        );
    }
}
