//! Mock searcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::code::Code;
use crate::searcher::{SearchError, SearchResult, Searcher};

/// Mock implementation of the Searcher trait.
///
/// Results and errors are scripted per code. Codes with nothing scripted
/// return an empty result list. Every query is recorded.
#[derive(Debug, Default)]
pub struct MockSearcher {
    results: Arc<RwLock<HashMap<String, Vec<SearchResult>>>>,
    errors: Arc<RwLock<HashMap<String, SearchError>>>,
    searches: Arc<RwLock<Vec<Code>>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned for `code`.
    pub async fn set_results(&self, code: &str, results: Vec<SearchResult>) {
        self.results
            .write()
            .await
            .insert(code.to_ascii_uppercase(), results);
    }

    /// Make every search for `code` fail.
    pub async fn set_error(&self, code: &str, error: SearchError) {
        self.errors
            .write()
            .await
            .insert(code.to_ascii_uppercase(), error);
    }

    /// Codes searched, in order.
    pub async fn recorded_searches(&self) -> Vec<Code> {
        self.searches.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, code: &Code) -> Result<Vec<SearchResult>, SearchError> {
        self.searches.write().await.push(code.clone());

        if let Some(error) = self.errors.read().await.get(code.as_str()) {
            return Err(error.clone());
        }

        Ok(self
            .results
            .read()
            .await
            .get(code.as_str())
            .cloned()
            .unwrap_or_default())
    }
}
