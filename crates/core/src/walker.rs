//! Media file discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

use crate::code::{extract_code, Code};

/// A media file found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Absolute path.
    pub path: PathBuf,
    pub file_name: String,
    /// Code extracted from the file name, if any.
    pub code: Option<Code>,
}

impl MediaFile {
    pub fn from_path(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let code = extract_code(&file_name);
        Self {
            path,
            file_name,
            code,
        }
    }
}

/// Errors that stop a single root from being walked.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Scan root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Scan root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to resolve scan root {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Recursive walker filtering by media extension.
#[derive(Debug, Clone)]
pub struct MediaWalker {
    extensions: HashSet<String>,
    follow_links: bool,
}

impl MediaWalker {
    pub fn new<I, S>(extensions: I, follow_links: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            extensions,
            follow_links,
        }
    }

    /// Whether a path has one of the configured media extensions.
    pub fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Lazily walk `root`, yielding media files in directory order.
    ///
    /// Root problems are reported up front; unreadable entries during the
    /// walk are logged and skipped.
    pub fn walk(&self, root: &Path) -> Result<impl Iterator<Item = MediaFile> + '_, WalkError> {
        let root = root.canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WalkError::RootNotFound {
                    path: root.to_path_buf(),
                }
            } else {
                WalkError::Io {
                    path: root.to_path_buf(),
                    source: e,
                }
            }
        })?;

        if !root.is_dir() {
            return Err(WalkError::NotADirectory { path: root });
        }

        let entries = WalkDir::new(&root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter();

        Ok(entries.filter_map(move |entry| match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && self.is_media(entry.path()) {
                    Some(MediaFile::from_path(entry.into_path()))
                } else {
                    None
                }
            }
            Err(e) => {
                warn!(
                    path = ?e.path(),
                    error = %e,
                    "Skipping unreadable entry"
                );
                None
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn walker() -> MediaWalker {
        MediaWalker::new(["mp4", "mkv", "avi", "mov", "wmv"], false)
    }

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_walk_filters_by_extension_recursively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "IPX-922.mp4");
        touch(dir.path(), "nested/deep/ABP-100.MKV");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "nested/random_clip.avi");

        let files: Vec<MediaFile> = walker().walk(dir.path()).unwrap().collect();
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();

        assert_eq!(names, vec!["IPX-922.mp4", "ABP-100.MKV", "random_clip.avi"]);
        assert!(files.iter().all(|f| f.path.is_absolute()));
        assert_eq!(files[0].code.as_ref().unwrap().as_str(), "IPX-922");
        assert_eq!(files[1].code.as_ref().unwrap().as_str(), "ABP-100");
        assert!(files[2].code.is_none());
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = walker().walk(&missing).err().unwrap();
        assert!(matches!(err, WalkError::RootNotFound { .. }));
    }

    #[test]
    fn test_walk_file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "IPX-922.mp4");
        let err = walker().walk(&dir.path().join("IPX-922.mp4")).err().unwrap();
        assert!(matches!(err, WalkError::NotADirectory { .. }));
    }

    #[test]
    fn test_extensions_normalized() {
        let walker = MediaWalker::new([".MP4", " mkv "], false);
        assert!(walker.is_media(Path::new("a.mp4")));
        assert!(walker.is_media(Path::new("a.Mkv")));
        assert!(!walker.is_media(Path::new("a.avi")));
        assert!(!walker.is_media(Path::new("mp4")));
    }

    #[test]
    fn test_walk_skips_directories_named_like_media() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("ABC-123.mp4")).unwrap();
        touch(dir.path(), "ABC-123.mp4/inner.mkv");
        let names: Vec<String> = walker()
            .walk(dir.path())
            .unwrap()
            .map(|f| f.file_name)
            .collect();
        assert_eq!(names, vec!["inner.mkv"]);
    }
}
