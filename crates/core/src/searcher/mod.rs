//! Remote cover search.
//!
//! A `Searcher` turns a product code into candidate (title, cover URL)
//! pairs. The javday implementation renders the search page through a
//! `PageRenderer` because the result list is produced by page scripts.

mod javday;
mod renderer;
mod types;

pub use javday::{parse_search_results, JavdaySearcher, RESULT_MARKER};
pub use renderer::{create_renderer, ChromeRenderer, HttpRenderer, PageRenderer};
pub use types::*;
