//! Pipeline configuration.

use std::path::{Path, PathBuf};

use crate::config::{Config, CoverPathBase};

/// Resolved settings for one pipeline run. All paths are absolute.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scan roots, in processing order.
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub follow_links: bool,
    /// Directory covers are written to.
    pub cover_dir: PathBuf,
    /// What recorded cover paths are relative to.
    pub cover_path_base: CoverPathBase,
    pub catalog_path: PathBuf,
    /// Flush the catalog after this many new records.
    pub flush_batch_size: usize,
    /// Working directory relative paths were resolved against.
    pub working_dir: PathBuf,
}

impl PipelineConfig {
    /// Resolve the file configuration against a working directory.
    pub fn from_config(config: &Config, working_dir: &Path) -> Self {
        Self {
            roots: config
                .scan
                .roots
                .iter()
                .map(|r| absolutize(working_dir, r))
                .collect(),
            extensions: config.scan.extensions.clone(),
            follow_links: config.scan.follow_links,
            cover_dir: absolutize(working_dir, &config.covers.output_dir),
            cover_path_base: config.covers.path_base,
            catalog_path: absolutize(working_dir, &config.catalog.path),
            flush_batch_size: config.catalog.flush_batch_size.max(1),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Base directory cover paths are made relative to, for a given root.
    pub fn cover_base(&self, root: &Path) -> PathBuf {
        match self.cover_path_base {
            CoverPathBase::WorkingDir => self.working_dir.clone(),
            CoverPathBase::ScanRoot => root.to_path_buf(),
            CoverPathBase::CatalogDir => self
                .catalog_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.working_dir.clone()),
        }
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
