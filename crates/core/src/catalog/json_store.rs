//! JSON-file catalog store.

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::code::Code;

use super::{Catalog, CatalogError, CatalogRecord, CatalogStore};

/// Catalog kept in memory and written to a single JSON file.
///
/// The file is a JSON object keyed by code, indented with four spaces and
/// written as UTF-8 with non-ASCII text kept verbatim.
#[derive(Debug)]
pub struct JsonCatalogStore {
    path: PathBuf,
    catalog: Catalog,
    pending: usize,
    /// The file on disk differs from the catalog (loaded lossily).
    dirty: bool,
}

impl JsonCatalogStore {
    /// Load the catalog at `path`.
    ///
    /// A missing or empty file gives an empty catalog. A malformed file is
    /// copied aside to `<file>.corrupt-<timestamp>` and also gives an empty
    /// catalog. Only I/O failures other than "not found" are errors.
    ///
    /// After a lossy load the next flush rewrites the file even when no
    /// record was added.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let (catalog, dirty) = match fs::read_to_string(path) {
            Ok(text) => parse_catalog(path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No catalog file yet, starting empty");
                (Catalog::new(), false)
            }
            Err(e) => {
                return Err(CatalogError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        info!(path = %path.display(), records = catalog.len(), "Catalog loaded");

        Ok(Self {
            path: path.to_path_buf(),
            catalog,
            pending: 0,
            dirty,
        })
    }

    fn render(&self) -> Result<Vec<u8>, CatalogError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.catalog.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl CatalogStore for JsonCatalogStore {
    fn contains(&self, code: &Code) -> bool {
        self.catalog.contains_key(code)
    }

    fn get(&self, code: &Code) -> Option<&CatalogRecord> {
        self.catalog.get(code)
    }

    fn upsert(&mut self, code: Code, record: CatalogRecord) -> bool {
        if self.catalog.contains_key(&code) {
            return false;
        }
        self.catalog.insert(code, record);
        self.pending += 1;
        true
    }

    fn len(&self) -> usize {
        self.catalog.len()
    }

    fn pending(&self) -> usize {
        self.pending
    }

    fn flush(&mut self) -> Result<(), CatalogError> {
        if self.pending == 0 && !self.dirty && self.path.exists() {
            return Ok(());
        }

        let bytes = self.render()?;
        write_atomic(&self.path, &bytes)?;

        debug!(
            path = %self.path.display(),
            records = self.catalog.len(),
            flushed = self.pending,
            "Catalog flushed"
        );
        self.pending = 0;
        self.dirty = false;
        Ok(())
    }

    fn snapshot(&self) -> &Catalog {
        &self.catalog
    }
}

/// Parse catalog text in file order, discarding what cannot be used.
///
/// The flag is set when anything was discarded.
fn parse_catalog(path: &Path, text: &str) -> (Catalog, bool) {
    if text.trim().is_empty() {
        return (Catalog::new(), false);
    }

    let raw: IndexMap<String, serde_json::Value> = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Catalog file is malformed, starting empty");
            back_up_corrupt(path);
            return (Catalog::new(), true);
        }
    };

    let mut catalog = Catalog::with_capacity(raw.len());
    let mut dropped = 0usize;

    for (key, value) in raw {
        let code = match key.parse::<Code>() {
            Ok(code) => code,
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping catalog entry with invalid code");
                dropped += 1;
                continue;
            }
        };
        match serde_json::from_value::<CatalogRecord>(value) {
            Ok(record) => {
                if catalog.contains_key(&code) {
                    warn!(code = %code, "Duplicate catalog key after normalization, keeping first");
                    dropped += 1;
                } else {
                    catalog.insert(code, record);
                }
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Dropping malformed catalog entry");
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        back_up_corrupt(path);
    }

    (catalog, dropped > 0)
}

/// Copy a catalog file aside before it gets overwritten with fewer entries.
fn back_up_corrupt(path: &Path) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    let backup = path.with_file_name(format!(
        "{}.corrupt-{}",
        file_name,
        Utc::now().format("%Y%m%d%H%M%S")
    ));

    match fs::copy(path, &backup) {
        Ok(_) => warn!(backup = %backup.display(), "Original catalog saved"),
        Err(e) => warn!(backup = %backup.display(), error = %e, "Failed to back up catalog"),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CatalogError> {
    let io_err = |source: std::io::Error| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(e));
    }
    Ok(())
}
