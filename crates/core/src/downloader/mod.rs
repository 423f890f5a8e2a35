//! Cover download engine.
//!
//! `CoverDownloader` fetches one image through an ordered list of transports:
//! several attempts with headless Chromium, then a single plain HTTP
//! attempt. Files are written atomically and an existing destination
//! short-circuits the whole operation.
//!
//! # Example
//!
//! ```ignore
//! use fanhao_core::downloader::{BrowserTransport, CoverDownloader, HttpTransport};
//!
//! let downloader = CoverDownloader::new(
//!     Arc::new(BrowserTransport::new(&config.download, session, &referer)),
//!     Arc::new(HttpTransport::new(&config.download, &referer)?),
//!     RetryPolicy::from_download_config(&config.download),
//! );
//!
//! let outcome = downloader.fetch(&cover_url, &dest).await?;
//! ```

mod engine;
mod error;
mod transport;

pub use engine::{cover_file_name, CoverDownloader, FetchOutcome};
pub use error::{DownloadError, TransportError};
pub use transport::{BrowserTransport, HttpTransport, Transport};
