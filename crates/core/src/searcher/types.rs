//! Types for the cover search system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::code::Code;

/// One candidate returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title as shown by the source (usually "<CODE> <actor>").
    pub title: String,
    /// Absolute URL of the cover image.
    pub cover_url: String,
}

/// Errors that can occur during search operations.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search backend returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Request timeout")]
    Timeout,

    #[error("Page render failed: {0}")]
    RenderFailed(String),

    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),
}

impl SearchError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Every status is retried, including 4xx. Only a missing renderer is
    /// permanent.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RendererUnavailable(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::ConnectionFailed(e.to_string())
        } else if let Some(status) = e.status() {
            SearchError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            SearchError::ConnectionFailed(e.to_string())
        }
    }
}

/// Trait for cover search backends.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Search for a code. Results are in source order; callers use the first.
    async fn search(&self, code: &Code) -> Result<Vec<SearchResult>, SearchError>;
}
