use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser user agent sent by both the renderer and the download transports.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub scan: ScanConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub covers: CoversConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Which directories are scanned and which files count as media.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Root directories, scanned in order.
    pub roots: Vec<PathBuf>,
    /// Media file extensions (compared case-insensitively, no leading dot).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_links: bool,
}

fn default_extensions() -> Vec<String> {
    ["mp4", "mkv", "avi", "mov", "wmv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Catalog file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Flush to disk after this many new records.
    #[serde(default = "default_flush_batch_size")]
    pub flush_batch_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            flush_batch_size: default_flush_batch_size(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("metadata.json")
}

fn default_flush_batch_size() -> usize {
    10
}

/// Where the recorded cover path is made relative to.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoverPathBase {
    /// The process working directory at startup.
    #[default]
    WorkingDir,
    /// The scan root the video was found under.
    ScanRoot,
    /// The directory containing the catalog file.
    CatalogDir,
}

/// Cover output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoversConfig {
    #[serde(default = "default_cover_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub path_base: CoverPathBase,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            output_dir: default_cover_dir(),
            path_base: CoverPathBase::default(),
        }
    }
}

fn default_cover_dir() -> PathBuf {
    PathBuf::from("covers")
}

/// How search result pages are turned into HTML.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Headless Chromium, executes page scripts.
    #[default]
    Chrome,
    /// Plain HTTP GET, for sources that serve results statically.
    Http,
}

/// Remote search source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Search site base URL (e.g., "https://javday.app")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Query parameter carrying the code.
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default)]
    pub renderer: RendererKind,
    /// Chromium executable for the browser session; detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    /// Upper bound for a whole page render, in seconds.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    /// How long scripts get to produce the result list, in seconds.
    #[serde(default = "default_marker_wait")]
    pub marker_wait_secs: u64,
    /// Maximum candidates parsed per search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query_param: default_query_param(),
            renderer: RendererKind::default(),
            chrome_path: None,
            page_timeout_secs: default_page_timeout(),
            marker_wait_secs: default_marker_wait(),
            max_results: default_max_results(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://javday.app".to_string()
}

fn default_query_param() -> String {
    "wd".to_string()
}

fn default_page_timeout() -> u64 {
    20
}

fn default_marker_wait() -> u64 {
    10
}

fn default_max_results() -> usize {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Cover download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Attempts with the primary transport before falling back.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Referer header; defaults to the search base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            timeout_secs: default_download_timeout(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            user_agent: default_user_agent(),
            referer: None,
        }
    }
}

fn default_retry_count() -> u32 {
    3
}

fn default_download_timeout() -> u64 {
    15
}

fn default_backoff_base() -> u64 {
    500
}

fn default_backoff_max() -> u64 {
    5000
}

impl Config {
    /// Referer sent with cover requests.
    pub fn referer(&self) -> String {
        match &self.download.referer {
            Some(referer) => referer.clone(),
            None => format!("{}/", self.search.base_url.trim_end_matches('/')),
        }
    }
}
