//! Pipeline lifecycle integration tests.
//!
//! These run the real searcher, downloader and catalog store against a
//! scripted renderer and scripted transports:
//! - A new code goes from file name to catalog record and cover file
//! - A second run over the same files does no network work
//! - Search and root failures stay contained to one file or root
//! - The catalog is flushed in batches and at the end

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use fanhao_core::{
    catalog::{Catalog, CatalogError, CatalogRecord, CatalogStore, JsonCatalogStore},
    code::Code,
    config::{load_config_from_str, SearchConfig},
    downloader::{CoverDownloader, TransportError},
    orchestrator::{CoverPipeline, PipelineConfig, RunSummary},
    retry::RetryPolicy,
    searcher::{JavdaySearcher, SearchError},
    testing::{fixtures, MockRenderer, MockTransport},
};

/// Test helper wiring a pipeline over a temp workspace.
struct TestHarness {
    dir: TempDir,
    renderer: Arc<MockRenderer>,
    primary: Arc<MockTransport>,
    fallback: Arc<MockTransport>,
}

impl TestHarness {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("videos")).unwrap();
        Self {
            dir,
            renderer: Arc::new(MockRenderer::new()),
            primary: Arc::new(MockTransport::new("browser")),
            fallback: Arc::new(MockTransport::new("http")),
        }
    }

    /// Fresh mocks over the same workspace, as a new process would have.
    fn restart(self) -> Self {
        Self {
            dir: self.dir,
            renderer: Arc::new(MockRenderer::new()),
            primary: Arc::new(MockTransport::new("browser")),
            fallback: Arc::new(MockTransport::new("http")),
        }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("videos")
    }

    fn catalog_path(&self) -> PathBuf {
        self.dir.path().join("metadata.json")
    }

    fn video(&self, name: &str) {
        fs::write(self.root().join(name), b"").unwrap();
    }

    fn config(&self, extra: &str) -> PipelineConfig {
        let toml = format!(
            r#"
[scan]
roots = ['{root}']

[catalog]
path = 'metadata.json'
{extra}

[covers]
output_dir = 'covers'
path_base = "catalog_dir"
"#,
            root = self.root().display(),
            extra = extra,
        );
        let config = load_config_from_str(&toml).expect("Failed to parse config");
        PipelineConfig::from_config(&config, self.dir.path())
    }

    async fn page(&self, code: &str, actor: &str) {
        let title = format!("{} {}", code, actor);
        let cover = format!("/uploads/{}.jpg", code);
        self.renderer
            .push_page(fixtures::result_page(&[(title.as_str(), cover.as_str())]))
            .await;
    }

    fn pipeline_with_store(
        &self,
        config: PipelineConfig,
        store: Box<dyn CatalogStore>,
    ) -> CoverPipeline {
        let searcher = JavdaySearcher::new(
            &SearchConfig::default(),
            self.renderer.clone(),
            RetryPolicy::immediate(3),
        );
        let downloader = CoverDownloader::new(
            self.primary.clone(),
            self.fallback.clone(),
            RetryPolicy::immediate(3),
        );
        CoverPipeline::new(config, Arc::new(searcher), downloader, store)
    }

    async fn run(&self, config: PipelineConfig) -> (RunSummary, Catalog) {
        let store = JsonCatalogStore::load(&config.catalog_path).unwrap();
        let mut pipeline = self.pipeline_with_store(config, Box::new(store));
        let summary = pipeline.run(&AtomicBool::new(false)).await;
        (summary, pipeline.store().snapshot().clone())
    }
}

fn code(s: &str) -> Code {
    s.parse().unwrap()
}

fn read_catalog(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_new_code_is_cataloged_end_to_end() {
    let h = TestHarness::new();
    h.video("IPX-922.mp4");
    h.page("IPX-922", "坂道みる").await;
    h.primary.push_body(b"\xff\xd8jpeg".to_vec()).await;

    let (summary, catalog) = h.run(h.config("")).await;

    assert_eq!(summary.recorded, 1);
    assert!(summary.final_flush_ok);

    let record = &catalog[&code("IPX-922")];
    assert_eq!(record.title, "IPX-922 坂道みる");
    assert_eq!(record.cover_path, "covers/IPX-922.jpg");
    assert_eq!(record.actor_name.as_deref(), Some("坂道みる"));
    assert!(record.video_path.ends_with("videos/IPX-922.mp4"));

    assert_eq!(
        fs::read(h.dir.path().join("covers/IPX-922.jpg")).unwrap(),
        b"\xff\xd8jpeg"
    );
    assert_eq!(
        h.renderer.rendered_urls().await,
        vec!["https://javday.app/search?wd=IPX-922".to_string()]
    );
    assert_eq!(
        h.primary.requested_urls().await,
        vec!["https://javday.app/uploads/IPX-922.jpg".to_string()]
    );

    let on_disk = read_catalog(&h.catalog_path());
    assert_eq!(on_disk["IPX-922"]["cover_path"], "covers/IPX-922.jpg");
    assert_eq!(on_disk["IPX-922"]["actor_name"], "坂道みる");
}

#[tokio::test]
async fn test_second_run_does_no_network_work() {
    let h = TestHarness::new();
    h.video("IPX-922.mp4");
    h.page("IPX-922", "坂道みる").await;
    h.primary.push_body(b"jpeg".to_vec()).await;
    let (_, first) = h.run(h.config("")).await;
    let first_text = fs::read_to_string(h.catalog_path()).unwrap();

    let h = h.restart();
    let (summary, second) = h.run(h.config("")).await;

    assert_eq!(summary.recorded, 0);
    assert_eq!(summary.skipped_cataloged, 1);
    assert_eq!(h.renderer.render_count().await, 0);
    assert_eq!(h.primary.call_count().await, 0);
    assert_eq!(h.fallback.call_count().await, 0);
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(h.catalog_path()).unwrap(), first_text);
}

#[tokio::test]
async fn test_search_timeout_skips_file_and_continues() {
    let h = TestHarness::new();
    h.video("ABC-999.mp4");
    h.video("IPX-922.mp4");
    for _ in 0..3 {
        h.renderer.push_error(SearchError::Timeout).await;
    }
    h.page("IPX-922", "坂道みる").await;
    h.primary.push_body(b"jpeg".to_vec()).await;

    let (summary, catalog) = h.run(h.config("")).await;

    assert_eq!(summary.search_failures, 1);
    assert_eq!(summary.recorded, 1);
    assert!(!catalog.contains_key(&code("ABC-999")));
    assert!(catalog.contains_key(&code("IPX-922")));
    assert_eq!(h.renderer.render_count().await, 4);
}

#[tokio::test]
async fn test_skipped_file_is_retried_next_run() {
    let h = TestHarness::new();
    h.video("ABC-999.mp4");
    for _ in 0..3 {
        h.renderer.push_error(SearchError::Timeout).await;
    }
    let (summary, _) = h.run(h.config("")).await;
    assert_eq!(summary.search_failures, 1);

    let h = h.restart();
    h.page("ABC-999", "Someone").await;
    h.primary.push_body(b"jpeg".to_vec()).await;
    let (summary, catalog) = h.run(h.config("")).await;

    assert_eq!(summary.recorded, 1);
    assert_eq!(catalog[&code("ABC-999")].actor_name.as_deref(), Some("Someone"));
}

#[tokio::test]
async fn test_download_falls_back_to_second_transport() {
    let h = TestHarness::new();
    h.video("IPX-922.mp4");
    h.page("IPX-922", "坂道みる").await;
    h.primary.set_default_error(TransportError::HttpStatus { status: 503 }).await;
    h.fallback.push_body(b"jpeg".to_vec()).await;

    let (summary, catalog) = h.run(h.config("")).await;

    assert_eq!(summary.recorded, 1);
    assert_eq!(h.primary.call_count().await, 3);
    assert_eq!(h.fallback.call_count().await, 1);
    assert!(catalog.contains_key(&code("IPX-922")));
}

#[tokio::test]
async fn test_missing_root_is_contained() {
    let h = TestHarness::new();
    h.video("IPX-922.mp4");
    h.page("IPX-922", "坂道みる").await;
    h.primary.push_body(b"jpeg".to_vec()).await;

    let mut config = h.config("");
    config.roots.insert(0, h.dir.path().join("unplugged-drive"));
    let (summary, catalog) = h.run(config).await;

    assert_eq!(summary.roots_failed, 1);
    assert_eq!(summary.roots_scanned, 1);
    assert!(catalog.contains_key(&code("IPX-922")));
}

/// Store wrapper counting flushes.
struct CountingStore {
    inner: JsonCatalogStore,
    flushes: Arc<AtomicUsize>,
}

impl CatalogStore for CountingStore {
    fn contains(&self, code: &Code) -> bool {
        self.inner.contains(code)
    }

    fn get(&self, code: &Code) -> Option<&CatalogRecord> {
        self.inner.get(code)
    }

    fn upsert(&mut self, code: Code, record: CatalogRecord) -> bool {
        self.inner.upsert(code, record)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn pending(&self) -> usize {
        self.inner.pending()
    }

    fn flush(&mut self) -> Result<(), CatalogError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.flush()
    }

    fn snapshot(&self) -> &Catalog {
        self.inner.snapshot()
    }
}

#[tokio::test]
async fn test_catalog_flushed_in_batches() {
    let h = TestHarness::new();
    let codes = ["AAA-001", "AAA-002", "AAA-003", "AAA-004", "AAA-005"];
    for c in codes {
        h.video(&format!("{}.mp4", c));
        h.page(c, "Actor").await;
        h.primary.push_body(b"jpeg".to_vec()).await;
    }

    let config = h.config("flush_batch_size = 2");
    let flushes = Arc::new(AtomicUsize::new(0));
    let store = CountingStore {
        inner: JsonCatalogStore::load(&config.catalog_path).unwrap(),
        flushes: flushes.clone(),
    };
    let mut pipeline = h.pipeline_with_store(config, Box::new(store));
    let summary = pipeline.run(&AtomicBool::new(false)).await;

    assert_eq!(summary.recorded, 5);
    // after records 2 and 4, then the final flush
    assert_eq!(flushes.load(Ordering::SeqCst), 3);
    assert_eq!(pipeline.store().pending(), 0);

    let on_disk = read_catalog(&h.catalog_path());
    let keys: Vec<&String> = on_disk.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 5);
}

#[tokio::test]
async fn test_existing_records_are_preserved() {
    let h = TestHarness::new();
    fs::write(
        h.catalog_path(),
        r#"{
    "SSIS-001": {
        "title": "SSIS-001 Earlier",
        "cover_path": "covers/SSIS-001.jpg",
        "video_path": "/elsewhere/SSIS-001.mp4",
        "actor_name": "Earlier",
        "rating": 5
    }
}
"#,
    )
    .unwrap();
    h.video("IPX-922.mp4");
    h.page("IPX-922", "坂道みる").await;
    h.primary.push_body(b"jpeg".to_vec()).await;

    let (summary, _) = h.run(h.config("")).await;
    assert_eq!(summary.recorded, 1);

    let on_disk = read_catalog(&h.catalog_path());
    assert_eq!(on_disk["SSIS-001"]["rating"], 5);
    assert_eq!(on_disk["SSIS-001"]["video_path"], "/elsewhere/SSIS-001.mp4");
    assert!(on_disk["IPX-922"].is_object());

    let text = fs::read_to_string(h.catalog_path()).unwrap();
    assert!(text.find("SSIS-001").unwrap() < text.find("IPX-922").unwrap());
}

#[tokio::test]
async fn test_existing_key_order_survives_run() {
    let h = TestHarness::new();
    fs::write(
        h.catalog_path(),
        r#"{
    "SSIS-001": {"title": "SSIS-001 A", "cover_path": "covers/SSIS-001.jpg", "video_path": "/v/SSIS-001.mp4"},
    "ABP-100": {"title": "ABP-100 B", "cover_path": "covers/ABP-100.jpg", "video_path": "/v/ABP-100.mp4"}
}
"#,
    )
    .unwrap();
    h.video("ABP-100.mp4");
    h.video("IPX-922.mp4");
    h.page("IPX-922", "坂道みる").await;
    h.primary.push_body(b"jpeg".to_vec()).await;

    let (summary, _) = h.run(h.config("")).await;
    assert_eq!(summary.recorded, 1);

    let on_disk = read_catalog(&h.catalog_path());
    let keys: Vec<&str> = on_disk
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["SSIS-001", "ABP-100", "IPX-922"]);

    let reloaded = JsonCatalogStore::load(&h.catalog_path()).unwrap();
    let codes: Vec<&str> = reloaded.snapshot().keys().map(|c| c.as_str()).collect();
    assert_eq!(codes, keys);
}
