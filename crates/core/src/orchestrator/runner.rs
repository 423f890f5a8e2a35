//! Cover pipeline runner.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogRecord, CatalogStore};
use crate::downloader::{cover_file_name, CoverDownloader, FetchOutcome};
use crate::paths::{normalize, to_slash};
use crate::searcher::Searcher;
use crate::walker::{MediaFile, MediaWalker};

use super::config::PipelineConfig;
use super::types::{FailReason, FileOutcome, RunSummary, SkipReason};

/// Walks the scan roots and catalogs a cover for every new code.
pub struct CoverPipeline {
    config: PipelineConfig,
    walker: MediaWalker,
    searcher: Arc<dyn Searcher>,
    downloader: CoverDownloader,
    store: Box<dyn CatalogStore>,
}

impl CoverPipeline {
    pub fn new(
        config: PipelineConfig,
        searcher: Arc<dyn Searcher>,
        downloader: CoverDownloader,
        store: Box<dyn CatalogStore>,
    ) -> Self {
        let walker = MediaWalker::new(&config.extensions, config.follow_links);
        Self {
            config,
            walker,
            searcher,
            downloader,
            store,
        }
    }

    /// The catalog store.
    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    /// Run over every root in order.
    ///
    /// Setting `stop` ends the run after the file in progress. The catalog is
    /// always flushed before returning.
    pub async fn run(&mut self, stop: &AtomicBool) -> RunSummary {
        let mut summary = RunSummary::new();

        info!(
            roots = self.config.roots.len(),
            cataloged = self.store.len(),
            searcher = self.searcher.name(),
            "Cover pipeline started"
        );

        let roots = self.config.roots.clone();
        'roots: for root in &roots {
            if stop.load(Ordering::SeqCst) {
                summary.interrupted = true;
                break;
            }

            let walker = self.walker.clone();
            let files = match walker.walk(root) {
                Ok(files) => files,
                Err(e) => {
                    error!(root = %root.display(), error = %e, "Skipping scan root");
                    summary.roots_failed += 1;
                    continue;
                }
            };

            info!(root = %root.display(), "Scanning root");
            summary.roots_scanned += 1;

            for file in files {
                if stop.load(Ordering::SeqCst) {
                    summary.interrupted = true;
                    break 'roots;
                }

                let outcome = self.process_file(root, &file).await;
                summary.record(&outcome);

                if self.store.pending() >= self.config.flush_batch_size {
                    self.flush(&mut summary);
                }
            }
        }

        summary.final_flush_ok = self.flush(&mut summary);
        summary.finished_at = Some(chrono::Utc::now());

        info!(
            files = summary.files_seen,
            recorded = summary.recorded,
            skipped_no_code = summary.skipped_no_code,
            skipped_cataloged = summary.skipped_cataloged,
            skipped_no_result = summary.skipped_no_result,
            search_failures = summary.search_failures,
            download_failures = summary.download_failures,
            roots_failed = summary.roots_failed,
            interrupted = summary.interrupted,
            "Cover pipeline finished"
        );

        summary
    }

    /// Take one file as far through the pipeline as it goes.
    async fn process_file(&mut self, root: &Path, file: &MediaFile) -> FileOutcome {
        let Some(code) = file.code.clone() else {
            info!(path = %file.path.display(), "No code in file name, skipping");
            return FileOutcome::Skipped {
                reason: SkipReason::NoCode,
            };
        };

        if self.store.contains(&code) {
            info!(code = %code, path = %file.path.display(), "Already cataloged, skipping");
            return FileOutcome::Skipped {
                reason: SkipReason::AlreadyCataloged,
            };
        }

        let results = match self.searcher.search(&code).await {
            Ok(results) => results,
            Err(e) => {
                warn!(code = %code, error = %e, "Search failed, will retry next run");
                return FileOutcome::Skipped {
                    reason: SkipReason::SearchFailed(e.to_string()),
                };
            }
        };

        let Some(result) = results.into_iter().next() else {
            info!(code = %code, "No search result");
            return FileOutcome::Skipped {
                reason: SkipReason::NoResult,
            };
        };

        let destination = self
            .config
            .cover_dir
            .join(cover_file_name(&code, &result.cover_url));

        match self.downloader.fetch(&result.cover_url, &destination).await {
            Ok(FetchOutcome::AlreadyPresent) => {
                debug!(code = %code, path = %destination.display(), "Reusing existing cover");
            }
            Ok(FetchOutcome::Downloaded { bytes, transport }) => {
                debug!(code = %code, bytes, transport = %transport, "Cover downloaded");
            }
            Err(e) => {
                warn!(code = %code, url = %result.cover_url, error = %e, "Cover download failed");
                return FileOutcome::Failed {
                    code,
                    reason: FailReason::Download(e.to_string()),
                };
            }
        }

        let cover_path = normalize(&destination, &self.config.cover_base(root));
        let video_path = to_slash(&file.path);
        let record = CatalogRecord::new(result.title, cover_path, video_path);

        info!(
            code = %code,
            title = %record.title,
            cover = %record.cover_path,
            "Cataloged"
        );

        self.store.upsert(code.clone(), record);
        FileOutcome::Recorded { code }
    }

    fn flush(&mut self, summary: &mut RunSummary) -> bool {
        match self.store.flush() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, pending = self.store.pending(), "Catalog flush failed");
                summary.flush_failures += 1;
                false
            }
        }
    }
}
