//! javday search backend implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::code::Code;
use crate::config::SearchConfig;
use crate::retry::{retry, RetryPolicy};

use super::{PageRenderer, SearchError, SearchResult, Searcher};

/// CSS class of one result block; its presence means the list has rendered.
pub const RESULT_MARKER: &str = ".videoBox";

static STYLE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"url\((.*?)\)").expect("valid style url pattern"));

static BOX_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(RESULT_MARKER).expect("valid result selector"));
static COVER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".videoBox-cover").expect("valid cover selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".videoBox-info .title").expect("valid title selector"));

/// Searcher for javday-style result pages.
pub struct JavdaySearcher {
    base_url: String,
    query_param: String,
    max_results: usize,
    renderer: Arc<dyn PageRenderer>,
    policy: RetryPolicy,
}

impl JavdaySearcher {
    pub fn new(config: &SearchConfig, renderer: Arc<dyn PageRenderer>, policy: RetryPolicy) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query_param: config.query_param.clone(),
            max_results: config.max_results,
            renderer,
            policy,
        }
    }

    /// Build the search page URL for a code.
    pub fn search_url(&self, code: &Code) -> String {
        format!(
            "{}/search?{}={}",
            self.base_url,
            urlencoding::encode(&self.query_param),
            urlencoding::encode(code.as_str())
        )
    }
}

#[async_trait]
impl Searcher for JavdaySearcher {
    fn name(&self) -> &str {
        "javday"
    }

    async fn search(&self, code: &Code) -> Result<Vec<SearchResult>, SearchError> {
        let start = Instant::now();
        let url = self.search_url(code);
        debug!(code = %code, url = %url, renderer = self.renderer.name(), "Searching");

        let html = retry(self.policy, "search", SearchError::is_retryable, |_| {
            self.renderer.render(&url)
        })
        .await
        .map_err(|exhausted| {
            let attempts = exhausted.errors.len();
            let last = exhausted
                .errors
                .into_iter()
                .last()
                .unwrap_or(SearchError::Timeout);
            warn!(code = %code, attempts, error = %last, "Search page could not be rendered");
            last
        })?;

        let results = parse_search_results(&html, &self.base_url, self.max_results);

        debug!(
            code = %code,
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(results)
    }
}

/// Parse a rendered result page.
///
/// Blocks without both a cover locator and a title are dropped. Returns an
/// empty list when the result marker is absent.
pub fn parse_search_results(html: &str, base_url: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    let mut results = Vec::new();
    let mut saw_marker = false;

    for block in document.select(&BOX_SELECTOR) {
        saw_marker = true;
        if results.len() >= max_results {
            break;
        }

        let cover_url = block
            .select(&COVER_SELECTOR)
            .next()
            .and_then(|div| div.value().attr("style"))
            .and_then(cover_locator_from_style)
            .map(|locator| absolutize(&locator, base_url));

        let title = block
            .select(&TITLE_SELECTOR)
            .next()
            .map(|span| collapse_whitespace(&span.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        if let (Some(title), Some(cover_url)) = (title, cover_url) {
            results.push(SearchResult { title, cover_url });
        }
    }

    if !saw_marker {
        debug!("Result marker {} not present", RESULT_MARKER);
    }

    results
}

fn cover_locator_from_style(style: &str) -> Option<String> {
    let captured = STYLE_URL.captures(style)?.get(1)?.as_str();
    let locator = captured.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    if locator.is_empty() {
        None
    } else {
        Some(locator.to_string())
    }
}

fn absolutize(locator: &str, base_url: &str) -> String {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        locator.to_string()
    } else if let Some(rest) = locator.strip_prefix("//") {
        format!("https://{}", rest)
    } else if locator.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), locator)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), locator)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
