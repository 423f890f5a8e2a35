//! Cover downloader: retry, fallback and atomic placement.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tracing::{debug, warn};

use crate::code::Code;
use crate::retry::{retry, RetryPolicy};

use super::error::{DownloadError, TransportError};
use super::transport::Transport;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// What `fetch` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; nothing was requested.
    AlreadyPresent,
    /// The cover was downloaded and written.
    Downloaded { bytes: usize, transport: String },
}

/// Downloads covers through a primary transport with retries, then a single
/// fallback attempt.
pub struct CoverDownloader {
    primary: Arc<dyn Transport>,
    fallback: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl CoverDownloader {
    pub fn new(
        primary: Arc<dyn Transport>,
        fallback: Arc<dyn Transport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            primary,
            fallback,
            policy,
        }
    }

    /// Fetch `url` into `destination`.
    ///
    /// Returns `AlreadyPresent` without any network activity when the
    /// destination exists. On failure no file is left at `destination`.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<FetchOutcome, DownloadError> {
        if fs::try_exists(destination).await.unwrap_or(false) {
            debug!(path = %destination.display(), "Cover already present");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let start = Instant::now();
        let (bytes, transport) = self.download(url).await?;
        write_atomic(destination, &bytes).await?;

        debug!(
            url,
            path = %destination.display(),
            bytes = bytes.len(),
            transport = %transport,
            duration_ms = start.elapsed().as_millis() as u64,
            "Cover saved"
        );

        Ok(FetchOutcome::Downloaded {
            bytes: bytes.len(),
            transport,
        })
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, String), DownloadError> {
        let primary_name = self.primary.name().to_string();

        let primary_errors = match retry(
            self.policy,
            "download",
            TransportError::is_retryable,
            |_| self.primary.get(url),
        )
        .await
        {
            Ok(bytes) => return Ok((bytes, primary_name)),
            Err(exhausted) => exhausted.errors,
        };

        warn!(
            url,
            attempts = primary_errors.len(),
            primary = %primary_name,
            fallback = self.fallback.name(),
            "Primary transport failed, trying fallback"
        );

        let mut errors: Vec<(String, TransportError)> = primary_errors
            .into_iter()
            .map(|e| (primary_name.clone(), e))
            .collect();

        match self.fallback.get(url).await {
            Ok(bytes) => Ok((bytes, self.fallback.name().to_string())),
            Err(e) => {
                errors.push((self.fallback.name().to_string(), e));
                Err(DownloadError::Exhausted {
                    url: url.to_string(),
                    errors,
                })
            }
        }
    }
}

/// Write to a sibling temporary file, then rename into place.
async fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&parent)
        .await
        .map_err(|e| DownloadError::DirectoryCreationFailed {
            path: parent.clone(),
            source: e,
        })?;

    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover".to_string());
    let temp_path = parent.join(format!(".{}.{}.part", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = fs::write(&temp_path, bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(DownloadError::WriteFailed {
            path: destination.to_path_buf(),
            source: e,
        });
    }

    if let Err(e) = fs::rename(&temp_path, destination).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(DownloadError::WriteFailed {
            path: destination.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// File name for a code's cover: `<CODE>.<ext>`, extension taken from the
/// URL when it is a known image type.
pub fn cover_file_name(code: &Code, url: &str) -> String {
    let ext = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
        })
        .and_then(|last| last.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string());

    format!("{}.{}", code, ext)
}
