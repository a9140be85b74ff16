//! # Organize Module
//!
//! Drives the per-file pipeline that turns an unsorted input tree into a
//! canonically laid-out library:
//! discover -> extract -> catalog lookup -> reconcile -> place -> commit.
//!
//! Files are processed independently on a bounded worker pool; a failure
//! in one file never aborts the batch, and the progress store alone
//! decides what is already done.

pub mod error;
pub mod layout;
pub mod organizer;
pub mod scanner;

pub use error::{OrganizeError, Result};
pub use organizer::{FileOutcome, OrganizeSummary, Organizer};
