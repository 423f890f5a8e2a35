pub mod browser;
pub mod catalog;
pub mod code;
pub mod config;
pub mod downloader;
pub mod net;
pub mod orchestrator;
pub mod paths;
pub mod retry;
pub mod searcher;
pub mod testing;
pub mod walker;

pub use browser::{BrowserError, BrowserSession};
pub use catalog::{Catalog, CatalogError, CatalogRecord, CatalogStore, JsonCatalogStore};
pub use code::{extract_actor_name, extract_code, Code, InvalidCode};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, CoverPathBase,
    RendererKind,
};
pub use downloader::{
    cover_file_name, BrowserTransport, CoverDownloader, DownloadError, FetchOutcome,
    HttpTransport, Transport, TransportError,
};
pub use orchestrator::{CoverPipeline, FailReason, FileOutcome, PipelineConfig, RunSummary, SkipReason};
pub use retry::{retry, RetryExhausted, RetryPolicy};
pub use searcher::{
    create_renderer, parse_search_results, JavdaySearcher, PageRenderer, SearchError,
    SearchResult, Searcher,
};
pub use walker::{MediaFile, MediaWalker, WalkError};
