//! Mock download transport for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::downloader::{Transport, TransportError};

/// Mock implementation of the Transport trait.
///
/// Each request pops the next scripted body or error. With an empty script
/// the default error is returned, or `404` if none is set.
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    script: Arc<RwLock<VecDeque<Result<Vec<u8>, TransportError>>>>,
    default_error: Arc<RwLock<Option<TransportError>>>,
    urls: Arc<RwLock<Vec<String>>>,
}

impl MockTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Arc::new(RwLock::new(VecDeque::new())),
            default_error: Arc::new(RwLock::new(None)),
            urls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn push_body(&self, body: Vec<u8>) {
        self.script.write().await.push_back(Ok(body));
    }

    pub async fn push_error(&self, error: TransportError) {
        self.script.write().await.push_back(Err(error));
    }

    /// Error returned once the script runs out.
    pub async fn set_default_error(&self, error: TransportError) {
        *self.default_error.write().await = Some(error);
    }

    /// URLs requested, in order.
    pub async fn requested_urls(&self) -> Vec<String> {
        self.urls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.urls.read().await.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.urls.write().await.push(url.to_string());

        if let Some(next) = self.script.write().await.pop_front() {
            return next;
        }

        Err(self
            .default_error
            .read()
            .await
            .clone()
            .unwrap_or(TransportError::HttpStatus { status: 404 }))
    }
}
