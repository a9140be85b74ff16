//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the organizer crates:
//! - Logging and tracing bootstrap
//! - Configuration management with fail-fast validation
//!
//! This crate establishes the error-handling and logging conventions the
//! rest of the workspace follows.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
