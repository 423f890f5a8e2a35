use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fanhao_core::{
    create_renderer, load_config, validate_config, BrowserSession, BrowserTransport,
    CoverDownloader, CoverPipeline, HttpTransport, JavdaySearcher, JsonCatalogStore, PageRenderer,
    PipelineConfig, RetryPolicy, RunSummary, Searcher,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Find cover artwork for coded media files and index it in a JSON catalog.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "FANHAO_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Scan root, replacing the configured roots (repeatable)
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run(cli).await {
        Ok(summary) if !summary.final_flush_ok => {
            error!("Catalog could not be saved");
            std::process::exit(2);
        }
        Ok(_) => {}
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    info!(version = VERSION, "fanhao starting");

    info!("Loading configuration from {:?}", cli.config);
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    if !cli.roots.is_empty() {
        config.scan.roots = cli.roots;
    }

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        roots = config.scan.roots.len(),
        catalog = %config.catalog.path.display(),
        "Configuration loaded"
    );

    let working_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let pipeline_config = PipelineConfig::from_config(&config, &working_dir);

    let policy = RetryPolicy::from_download_config(&config.download);
    let referer = config.referer();

    // Launched on first use; shared by the renderer and the primary transport.
    let browser = Arc::new(BrowserSession::new(&config.search));

    let renderer = create_renderer(&config.search, Arc::clone(&browser))
        .context("Failed to create page renderer")?;
    info!("Using page renderer: {}", renderer.name());
    let searcher: Arc<dyn Searcher> =
        Arc::new(JavdaySearcher::new(&config.search, renderer, policy));

    let primary = BrowserTransport::new(&config.download, Arc::clone(&browser), &referer);
    let fallback = HttpTransport::new(&config.download, &referer)
        .context("Failed to create http transport")?;
    let downloader = CoverDownloader::new(Arc::new(primary), Arc::new(fallback), policy);

    let store = JsonCatalogStore::load(&pipeline_config.catalog_path)
        .with_context(|| format!("Failed to load catalog {:?}", pipeline_config.catalog_path))?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = Arc::clone(&stop);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current file");
            stop_on_signal.store(true, Ordering::SeqCst);
        }
    });

    let mut pipeline = CoverPipeline::new(pipeline_config, searcher, downloader, Box::new(store));
    let summary = pipeline.run(&stop).await;
    browser.close().await;

    info!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "Run complete"
    );

    Ok(summary)
}
