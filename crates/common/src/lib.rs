//! Demorec Common Utilities
//!
//! Shared infrastructure for all demorec crates:
//! - Error types and result aliases
//! - Persisted configuration (capture output directory, encoder path)
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
