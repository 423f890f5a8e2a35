//! Types for the metadata catalog.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::code::{extract_actor_name, Code};

/// Code -> record, in insertion order.
pub type Catalog = IndexMap<Code, CatalogRecord>;

/// Metadata for one cataloged code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Title of the matched search result.
    pub title: String,
    /// Cover image path, relative to the configured base when possible.
    pub cover_path: String,
    /// Absolute, slash-form path of the video file.
    pub video_path: String,
    /// Actor name derived from the title.
    #[serde(default)]
    pub actor_name: Option<String>,
    /// Fields written by other tools, kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogRecord {
    /// Build a record, deriving the actor name from the title.
    pub fn new(title: impl Into<String>, cover_path: String, video_path: String) -> Self {
        let title = title.into();
        let actor_name = extract_actor_name(&title);
        Self {
            title,
            cover_path,
            video_path,
            actor_name,
            extra: serde_json::Map::new(),
        }
    }
}

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_derives_actor_name() {
        let record = CatalogRecord::new(
            "IPX-922 坂道みる",
            "covers/IPX-922.jpg".to_string(),
            "/v/IPX-922.mp4".to_string(),
        );
        assert_eq!(record.actor_name.as_deref(), Some("坂道みる"));
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = CatalogRecord::new(
            "IPX-922",
            "covers/IPX-922.jpg".to_string(),
            "/v/IPX-922.mp4".to_string(),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "IPX-922",
                "cover_path": "covers/IPX-922.jpg",
                "video_path": "/v/IPX-922.mp4",
                "actor_name": null
            })
        );
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let json = r#"{
            "title": "ABP-100 Someone",
            "cover_path": "covers/ABP-100.jpg",
            "video_path": "/v/ABP-100.mp4",
            "rating": 5
        }"#;
        let record: CatalogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.actor_name, None);
        assert_eq!(record.extra.get("rating"), Some(&serde_json::json!(5)));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["rating"], 5);
    }
}
