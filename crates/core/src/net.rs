//! Shared HTTP client setup.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use std::time::Duration;

pub const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
pub const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
pub const ACCEPT_LANGUAGE_ZH: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// What kind of resource the request is for, as a browser would declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Document,
    Image,
}

/// Header set a desktop browser sends for the given request kind.
pub fn browser_headers(kind: RequestKind, referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let (accept, dest, mode) = match kind {
        RequestKind::Document => (ACCEPT_HTML, "document", "navigate"),
        RequestKind::Image => (ACCEPT_IMAGE, "image", "no-cors"),
    };
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_ZH));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static(dest),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static(mode),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    if let Some(referer) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(REFERER, referer);
    }
    headers
}

/// Build a client with a fixed user agent and timeout.
pub fn build_client(
    user_agent: &str,
    timeout: Duration,
    cookies: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .cookie_store(cookies)
        .build()
}

/// `scheme://host[:port]/` of a URL, if it has one.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}/", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}/", parsed.scheme(), host)),
    }
}
