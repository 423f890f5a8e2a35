//! Page renderers: turn a URL into the HTML a browser would end up with.

use async_trait::async_trait;
use chromiumoxide::Page;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::browser::{BrowserError, BrowserSession};
use crate::config::{RendererKind, SearchConfig};
use crate::net::{browser_headers, build_client, origin_of, RequestKind};

use super::javday::RESULT_MARKER;
use super::SearchError;

const MARKER_POLL: Duration = Duration::from_millis(250);

/// Renders a page and returns its final DOM as HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, url: &str) -> Result<String, SearchError>;
}

/// Build the renderer selected in the search configuration.
///
/// The chrome renderer opens its tabs in `session`.
pub fn create_renderer(
    config: &SearchConfig,
    session: Arc<BrowserSession>,
) -> Result<Arc<dyn PageRenderer>, SearchError> {
    let renderer: Arc<dyn PageRenderer> = match config.renderer {
        RendererKind::Chrome => Arc::new(ChromeRenderer::new(config, session, RESULT_MARKER)),
        RendererKind::Http => Arc::new(HttpRenderer::new(config)?),
    };
    Ok(renderer)
}

impl From<BrowserError> for SearchError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Unavailable(reason) => SearchError::RendererUnavailable(reason),
            BrowserError::Timeout => SearchError::Timeout,
            BrowserError::Protocol(message) => SearchError::RenderFailed(message),
        }
    }
}

/// Headless Chromium renderer.
///
/// Navigates a fresh tab, waits up to `marker_wait` for `marker` to match an
/// element, then serializes the DOM. A page where the marker never shows up
/// is returned as is. The whole render is bounded by `page_timeout`.
pub struct ChromeRenderer {
    session: Arc<BrowserSession>,
    marker: String,
    marker_wait: Duration,
    page_timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(config: &SearchConfig, session: Arc<BrowserSession>, marker: &str) -> Self {
        Self {
            session,
            marker: marker.to_string(),
            marker_wait: Duration::from_secs(config.marker_wait_secs),
            page_timeout: Duration::from_secs(config.page_timeout_secs),
        }
    }

    async fn load(&self, page: &Page, url: &str) -> Result<String, SearchError> {
        page.goto(url).await.map_err(BrowserError::from)?;

        if !self.wait_for_marker(page).await {
            debug!(url, marker = %self.marker, "Marker did not appear, using DOM as is");
        }

        Ok(page.content().await.map_err(BrowserError::from)?)
    }

    async fn wait_for_marker(&self, page: &Page) -> bool {
        let deadline = Instant::now() + self.marker_wait;
        loop {
            if page.find_element(self.marker.as_str()).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(MARKER_POLL).await;
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    fn name(&self) -> &str {
        "chrome"
    }

    async fn render(&self, url: &str) -> Result<String, SearchError> {
        debug!(url, "Rendering page");

        let page = self.session.new_page().await?;
        let result = timeout(self.page_timeout, self.load(&page, url)).await;

        if let Err(e) = page.close().await {
            debug!(url, error = %e, "Closing tab failed");
        }

        let html = result.map_err(|_| SearchError::Timeout)??;
        if html.trim().is_empty() {
            return Err(SearchError::RenderFailed("empty DOM".to_string()));
        }
        Ok(html)
    }
}

/// Plain HTTP renderer for sources that serve results without scripts.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = build_client(
            &config.user_agent,
            Duration::from_secs(config.page_timeout_secs),
            true,
        )?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn render(&self, url: &str) -> Result<String, SearchError> {
        debug!(url, "Fetching page");

        let referer = origin_of(url);
        let response = self
            .client
            .get(url)
            .headers(browser_headers(RequestKind::Document, referer.as_deref()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
