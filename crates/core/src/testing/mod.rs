//! Testing utilities and mock implementations.
//!
//! Mocks stand in for every network-facing seam of the pipeline so the
//! whole flow can be exercised without a browser or a live site.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanhao_core::testing::{fixtures, MockSearcher, MockTransport};
//!
//! let searcher = MockSearcher::new();
//! searcher
//!     .set_results("IPX-922", vec![fixtures::search_result("IPX-922", "坂道みる")])
//!     .await;
//!
//! let primary = MockTransport::new("browser");
//! primary.push_body(b"jpeg".to_vec()).await;
//! ```

mod mock_renderer;
mod mock_searcher;
mod mock_transport;

pub use mock_renderer::MockRenderer;
pub use mock_searcher::MockSearcher;
pub use mock_transport::MockTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::searcher::SearchResult;

    /// A search result titled `"<code> <actor>"` with a cover on the default site.
    pub fn search_result(code: &str, actor: &str) -> SearchResult {
        SearchResult {
            title: format!("{} {}", code, actor),
            cover_url: format!("https://javday.app/uploads/{}.jpg", code),
        }
    }

    /// A rendered result page with one block per `(title, cover locator)`.
    pub fn result_page(entries: &[(&str, &str)]) -> String {
        let blocks: String = entries
            .iter()
            .map(|(title, cover)| {
                format!(
                    r#"<div class="videoBox">
  <a href="/videos/1"><div class="videoBox-cover" style="background-image: url({})"></div></a>
  <div class="videoBox-info"><span class="title">{}</span></div>
</div>
"#,
                    cover, title
                )
            })
            .collect();
        format!(
            "<html><head><title>search</title></head><body><div class=\"videoList\">\n{}</div></body></html>",
            blocks
        )
    }
}
