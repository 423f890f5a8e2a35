//! Cover pipeline orchestration.
//!
//! Each discovered file goes through:
//! `Discovered -> CodeExtracted -> Searched -> Downloaded -> Recorded`,
//! or stops in a skipped/failed state. Files are processed strictly one at a
//! time; anything that stops a file is contained at the file boundary and
//! the file is naturally retried on the next run.

mod config;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use runner::CoverPipeline;
pub use types::{FailReason, FileOutcome, RunSummary, SkipReason};
