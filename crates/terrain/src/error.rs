//! Error types for terrain loading.

use thiserror::Error;

/// Result alias for terrain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a terrain or its configuration.
///
/// Height queries never produce errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed terrain mesh: {0}")]
    Format(#[from] itri_decode::FormatError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid configuration: {field} {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },
}
