//! Shared headless Chromium session over the DevTools protocol.
//!
//! One browser process serves both the search renderer and the primary
//! download transport, so cookies a site hands out while rendering are
//! present when the cover is fetched. The process starts on first use and
//! lives until [`BrowserSession::close`].

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;

/// Errors from the browser session.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    /// The browser could not be started. Not worth retrying.
    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Browser request timed out")]
    Timeout,

    #[error("DevTools protocol error: {0}")]
    Protocol(String),
}

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::Timeout => BrowserError::Timeout,
            other => BrowserError::Protocol(other.to_string()),
        }
    }
}

struct Running {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

enum State {
    Idle,
    Running(Running),
    /// Launch failed; the error is returned to every later caller.
    Failed(BrowserError),
    Closed,
}

/// Lazily launched Chromium shared across renderer and transport.
pub struct BrowserSession {
    chrome_path: Option<PathBuf>,
    user_agent: String,
    launch_timeout: Duration,
    state: Mutex<State>,
}

impl BrowserSession {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            user_agent: config.user_agent.clone(),
            launch_timeout: Duration::from_secs(config.page_timeout_secs),
            state: Mutex::new(State::Idle),
        }
    }

    fn launch_config(&self, profile_dir: &Path) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .launch_timeout(self.launch_timeout)
            .request_timeout(self.launch_timeout)
            .args(self.args());

        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::Unavailable)
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--disable-gpu".to_string(),
            "--lang=zh-CN".to_string(),
            format!("--user-agent={}", self.user_agent),
        ]
    }

    /// Open a blank tab, launching the browser if needed.
    pub async fn new_page(&self) -> Result<Page, BrowserError> {
        let mut state = self.state.lock().await;

        if matches!(*state, State::Idle) {
            *state = match self.launch().await {
                Ok(running) => State::Running(running),
                Err(e) => {
                    warn!(error = %e, "Chromium could not be started");
                    State::Failed(e)
                }
            };
        }

        match &*state {
            State::Running(running) => Ok(running.browser.new_page("about:blank").await?),
            State::Failed(e) => Err(e.clone()),
            State::Closed => Err(BrowserError::Unavailable("session closed".to_string())),
            State::Idle => Err(BrowserError::Unavailable("not launched".to_string())),
        }
    }

    async fn launch(&self) -> Result<Running, BrowserError> {
        let profile_dir =
            std::env::temp_dir().join(format!("fanhao-chromium-{}", uuid::Uuid::new_v4()));
        let config = self.launch_config(&profile_dir)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Unavailable(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "DevTools handler error");
                }
            }
        });

        info!(ws = %browser.websocket_address(), "Chromium started");
        Ok(Running {
            browser,
            handler,
            profile_dir,
        })
    }

    /// Whether a browser process is currently running.
    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, State::Running(_))
    }

    /// Shut the browser down. Later calls to `new_page` fail.
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.lock().await, State::Closed);
        let State::Running(mut running) = previous else {
            return;
        };

        if let Err(e) = running.browser.close().await {
            debug!(error = %e, "Browser close request failed");
        }
        if let Err(e) = running.browser.wait().await {
            debug!(error = %e, "Waiting for browser exit failed");
        }
        running.handler.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&running.profile_dir).await {
            debug!(path = %running.profile_dir.display(), error = %e, "Profile cleanup failed");
        }
        info!("Chromium stopped");
    }
}
