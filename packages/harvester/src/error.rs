//! Error types for the harvester.
//!
//! Row-level defects never surface here: the parser drops them silently.
//! `HarvesterError` covers the file- and network-level failures that the
//! pipeline logs and recovers from.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to download one table file.
    #[error("Failed to download {name}: {source}")]
    Download {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote listing could not be interpreted.
    #[error("Invalid remote listing: {0}")]
    Listing(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Operator typed something that is neither an index nor the "all" token.
    #[error("Invalid selection: '{0}'. Expected a file index or 'A' for all")]
    InvalidSelection(String),

    /// A directory given on the command line does not exist.
    #[error("Directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
