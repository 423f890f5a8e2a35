//! Metadata catalog: code -> record, persisted as one JSON document.
//!
//! The catalog is the idempotency gate of the pipeline: a code present in
//! the catalog is never searched or downloaded again.

mod json_store;
mod types;

pub use json_store::JsonCatalogStore;
pub use types::*;

use crate::code::Code;

/// Trait for catalog storage.
///
/// A store has a single owner; the pipeline is its only writer.
pub trait CatalogStore: Send {
    /// Check if a code is already cataloged.
    fn contains(&self, code: &Code) -> bool;

    /// Get the record for a code.
    fn get(&self, code: &Code) -> Option<&CatalogRecord>;

    /// Insert a record unless the code is already present.
    ///
    /// Returns `true` if the record was added. Existing records are never
    /// replaced.
    fn upsert(&mut self, code: Code, record: CatalogRecord) -> bool;

    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the catalog has no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records added since the last flush.
    fn pending(&self) -> usize;

    /// Persist the full catalog.
    fn flush(&mut self) -> Result<(), CatalogError>;

    /// The in-memory catalog.
    fn snapshot(&self) -> &Catalog;
}
