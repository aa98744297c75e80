//! Crate error type and the reporting hook for illegal call sequences.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum PipError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Config validation error for '{scope}': missing threshold(s): {missing}")]
    MissingThresholds { scope: String, missing: String },

    #[error("Config validation error for device '{device}': display_width and display_height are required")]
    MissingDisplay { device: String },

    #[error("Failed to read trace file {path}: {source}")]
    TraceReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse trace: {0}")]
    TraceParseError(String),

    #[error("Host query failed: {0}")]
    HostUnavailable(String),
}

/// Report a call that violates the API's sequencing rules.
///
/// Fatal with debug assertions enabled, a logged no-op otherwise.
pub fn report_illegal_sequence(what: &str) {
    if cfg!(debug_assertions) {
        panic!("illegal call sequence: {what}");
    }
    log::error!("Illegal call sequence ignored: {what}");
}
