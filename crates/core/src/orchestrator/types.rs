//! Types for the cover pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::code::Code;

/// Why a file was left unprocessed without an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    /// No code in the file name.
    NoCode,
    /// The code is already in the catalog.
    AlreadyCataloged,
    /// The search returned nothing usable.
    NoResult,
    /// The search failed; retried on the next run.
    SearchFailed(String),
}

/// Why a file failed after a result was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FailReason {
    /// No transport could fetch the cover.
    Download(String),
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FileOutcome {
    Recorded { code: Code },
    Skipped { reason: SkipReason },
    Failed { code: Code, reason: FailReason },
}

/// Totals for a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Roots that were walked.
    pub roots_scanned: usize,
    /// Roots that could not be walked.
    pub roots_failed: usize,
    /// Media files seen.
    pub files_seen: usize,
    pub recorded: usize,
    pub skipped_no_code: usize,
    pub skipped_cataloged: usize,
    pub skipped_no_result: usize,
    pub search_failures: usize,
    pub download_failures: usize,
    /// Catalog flushes that failed (the data stays in memory).
    pub flush_failures: usize,
    /// Whether the final flush succeeded.
    pub final_flush_ok: bool,
    /// Whether the run stopped early on request.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            roots_scanned: 0,
            roots_failed: 0,
            files_seen: 0,
            recorded: 0,
            skipped_no_code: 0,
            skipped_cataloged: 0,
            skipped_no_result: 0,
            search_failures: 0,
            download_failures: 0,
            flush_failures: 0,
            final_flush_ok: false,
            interrupted: false,
        }
    }

    /// Count a file outcome.
    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files_seen += 1;
        match outcome {
            FileOutcome::Recorded { .. } => self.recorded += 1,
            FileOutcome::Skipped { reason } => match reason {
                SkipReason::NoCode => self.skipped_no_code += 1,
                SkipReason::AlreadyCataloged => self.skipped_cataloged += 1,
                SkipReason::NoResult => self.skipped_no_result += 1,
                SkipReason::SearchFailed(_) => self.search_failures += 1,
            },
            FileOutcome::Failed { reason, .. } => match reason {
                FailReason::Download(_) => self.download_failures += 1,
            },
        }
    }

    /// Files that ended skipped or failed.
    pub fn unprocessed(&self) -> usize {
        self.files_seen - self.recorded
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
