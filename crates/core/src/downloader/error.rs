//! Error types for the downloader module.

use std::path::PathBuf;
use thiserror::Error;

/// A single request failure.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Empty response body")]
    EmptyBody,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Any status is retried; only a browser that cannot start is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::BrowserUnavailable(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Errors that can occur while fetching a cover.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Every transport failed.
    #[error("All transports failed for {url}: {}", summarize(.errors))]
    Exhausted {
        url: String,
        /// `(transport, error)` pairs in attempt order.
        errors: Vec<(String, TransportError)>,
    },

    /// Failed to create the destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or move the downloaded bytes into place.
    #[error("Failed to write cover to {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn summarize(errors: &[(String, TransportError)]) -> String {
    errors
        .iter()
        .map(|(transport, e)| format!("{}: {}", transport, e))
        .collect::<Vec<_>>()
        .join("; ")
}
