//! Mock page renderer for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::searcher::{PageRenderer, SearchError};

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

/// Mock implementation of the PageRenderer trait.
///
/// Each render pops the next scripted page or error. When the script is
/// empty a blank page is returned.
#[derive(Debug, Default)]
pub struct MockRenderer {
    script: Arc<RwLock<VecDeque<Result<String, SearchError>>>>,
    urls: Arc<RwLock<Vec<String>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_page(&self, html: String) {
        self.script.write().await.push_back(Ok(html));
    }

    pub async fn push_error(&self, error: SearchError) {
        self.script.write().await.push_back(Err(error));
    }

    /// URLs rendered, in order.
    pub async fn rendered_urls(&self) -> Vec<String> {
        self.urls.read().await.clone()
    }

    pub async fn render_count(&self) -> usize {
        self.urls.read().await.len()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, url: &str) -> Result<String, SearchError> {
        self.urls.write().await.push(url.to_string());
        self.script
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(BLANK_PAGE.to_string()))
    }
}
