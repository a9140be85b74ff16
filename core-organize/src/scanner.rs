//! Input tree discovery
//!
//! Walks the input root and collects the files whose extension is on the
//! audio allow-list. Non-matching files and directories are left alone.

use crate::error::{OrganizeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions that qualify a file for organizing.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "flac", "aac", "wav"];

/// True when `path` has an allow-listed audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|allowed| e.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

/// Recursively collect audio files under `root`, sorted so batches run
/// in a deterministic order. Unreadable entries are skipped.
pub fn scan_directory(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(OrganizeError::Scan {
            root: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();

    debug!("Discovered {} audio files under {}", files.len(), root.display());

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(is_audio_file(Path::new("song.FLAC")));
        assert!(is_audio_file(Path::new("dir/song.aac")));
        assert!(is_audio_file(Path::new("song.wav")));
        assert!(!is_audio_file(Path::new("song.ogg")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("noextension")));
    }

    #[test]
    fn test_scan_collects_nested_audio_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/two.flac"), b"x").unwrap();
        fs::write(dir.path().join("one.mp3"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let files = scan_directory(dir.path()).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("b/two.flac"), dir.path().join("one.mp3")]
        );
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let result = scan_directory(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(OrganizeError::Scan { .. })));
    }
}
