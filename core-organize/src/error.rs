use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("Failed to scan {root}: {reason}")]
    Scan { root: PathBuf, reason: String },

    #[error("Placement failed for {path}: {reason}")]
    Placement { path: PathBuf, reason: String },

    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::MetadataError),

    #[error("Store error: {0}")]
    Store(#[from] core_store::StoreError),
}

pub type Result<T> = std::result::Result<T, OrganizeError>;
