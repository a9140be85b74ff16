//! # Progress Store Module
//!
//! Durable, SQLite-backed progress tracking: which source files have
//! been fully relocated, and where they went. The store is the sole
//! source of truth for "already done" - a file without a record is
//! retried from scratch on the next run.

pub mod db;
pub mod error;
pub mod progress;

pub use error::{Result, StoreError};
pub use progress::{ProgressRecord, ProgressStatus, ProgressStore, SqliteProgressStore};
