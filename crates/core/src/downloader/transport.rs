//! Download transports.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::GetResponseBodyParams;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, NavigateParams};
use chromiumoxide::Page;
use futures::StreamExt;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::debug;

use crate::browser::{BrowserError, BrowserSession};
use crate::config::DownloadConfig;
use crate::net::{browser_headers, build_client, origin_of, RequestKind};

use super::error::TransportError;

/// Upper bound on waiting for the network to settle after the image loaded.
const NETWORK_IDLE_WAIT: Duration = Duration::from_secs(3);

/// One way of fetching a URL's bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Fetch the full body. Non-2xx and empty bodies are errors.
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

impl From<BrowserError> for TransportError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Unavailable(reason) => TransportError::BrowserUnavailable(reason),
            BrowserError::Timeout => TransportError::Timeout,
            BrowserError::Protocol(message) => TransportError::Request(message),
        }
    }
}

impl From<chromiumoxide::error::CdpError> for TransportError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::from(e).into()
    }
}

/// Headless Chromium transport.
///
/// Each image is opened as a top-level navigation in a fresh tab of the
/// shared session, with the referer set, and the body is read back over the
/// DevTools protocol once the network has gone idle. Before the first image
/// the session visits the referer origin once, so any cookie or challenge
/// the site hands out is in place.
pub struct BrowserTransport {
    session: Arc<BrowserSession>,
    referer: String,
    timeout: Duration,
    primed: OnceCell<()>,
}

impl BrowserTransport {
    pub fn new(config: &DownloadConfig, session: Arc<BrowserSession>, referer: &str) -> Self {
        Self {
            session,
            referer: referer.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            primed: OnceCell::new(),
        }
    }

    async fn prime(&self) {
        self.primed
            .get_or_init(|| async {
                let Some(origin) = origin_of(&self.referer) else {
                    return;
                };
                let page = match self.session.new_page().await {
                    Ok(page) => page,
                    Err(e) => {
                        debug!(origin = %origin, error = %e, "Session priming skipped");
                        return;
                    }
                };
                match timeout(self.timeout, page.goto(origin.as_str())).await {
                    Ok(Ok(_)) => debug!(origin = %origin, "Session primed"),
                    Ok(Err(e)) => debug!(origin = %origin, error = %e, "Session priming failed"),
                    Err(_) => debug!(origin = %origin, "Session priming timed out"),
                }
                if let Err(e) = page.close().await {
                    debug!(error = %e, "Closing priming tab failed");
                }
            })
            .await;
    }

    async fn load(&self, page: &Page, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

        let navigate = NavigateParams::builder()
            .url(url)
            .referrer(self.referer.as_str())
            .build()
            .map_err(TransportError::Request)?;

        let request = page
            .http_future(navigate)?
            .await?
            .ok_or_else(|| TransportError::Request("navigation produced no request".to_string()))?;

        if let Some(failure) = &request.failure_text {
            return Err(TransportError::ConnectionFailed(failure.clone()));
        }

        let status = request
            .response
            .as_ref()
            .map(|response| response.status)
            .ok_or_else(|| TransportError::Request("navigation produced no response".to_string()))?;
        if !(200..300).contains(&status) {
            return Err(TransportError::HttpStatus {
                status: u16::try_from(status).unwrap_or(0),
            });
        }

        let idle = timeout(NETWORK_IDLE_WAIT, async {
            while let Some(event) = lifecycle.next().await {
                if event.name == "networkIdle" {
                    return;
                }
            }
        })
        .await;
        if idle.is_err() {
            debug!(url, "Network did not go idle, reading body anyway");
        }

        let body = page
            .execute(GetResponseBodyParams::new(request.request_id().clone()))
            .await?
            .result;
        let bytes = decode_body(&body.body, body.base64_encoded)?;
        if bytes.is_empty() {
            return Err(TransportError::EmptyBody);
        }
        Ok(bytes)
    }
}

#[async_trait]
impl Transport for BrowserTransport {
    fn name(&self) -> &str {
        "browser"
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.prime().await;

        let page = self.session.new_page().await?;
        let result = timeout(self.timeout, self.load(&page, url)).await;

        if let Err(e) = page.close().await {
            debug!(url, error = %e, "Closing tab failed");
        }

        result.map_err(|_| TransportError::Timeout)?
    }
}

fn decode_body(body: &str, base64_encoded: bool) -> Result<Vec<u8>, TransportError> {
    if base64_encoded {
        STANDARD
            .decode(body)
            .map_err(|e| TransportError::Request(format!("undecodable body: {}", e)))
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

/// Plain HTTP transport: browser headers and referer, no session.
pub struct HttpTransport {
    client: Client,
    referer: String,
}

impl HttpTransport {
    pub fn new(config: &DownloadConfig, referer: &str) -> Result<Self, TransportError> {
        let client = build_client(
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
            false,
        )?;
        Ok(Self {
            client,
            referer: referer.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .headers(browser_headers(RequestKind::Image, Some(&self.referer)))
            .send()
            .await?;

        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::HttpStatus {
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(TransportError::EmptyBody);
    }
    Ok(body.to_vec())
}
