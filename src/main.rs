//! Spindle command-line interface

use clap::Parser;
use spindle::config::{load_config, validate_config, Config, CrawlConfig, FetchConfig, StorageConfig};
use spindle::crawler::{CrawlStep, HttpFetcher, HtmlLinkExtractor};
use spindle::scheduler::{AcceptFn, Scheduler};
use spindle::storage::SqlitePageStore;
use spindle::{output, SpindleError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Spindle: a level-synchronized breadth-first web crawler
///
/// Spindle crawls outward from a seed URL one BFS level at a time,
/// deduplicating targets, spilling excess work to disk, and optionally
/// saving page content to SQLite.
#[derive(Parser, Debug)]
#[command(name = "spindle")]
#[command(version = "0.9.0")]
#[command(about = "A level-synchronized breadth-first web crawler", long_about = None)]
struct Cli {
    /// Seed URL to start crawling from
    #[arg(short, long, conflicts_with = "config")]
    url: Option<String>,

    /// Maximum crawl depth (0 crawls only the seed)
    #[arg(short, long, default_value_t = 3)]
    depth: u32,

    /// Number of concurrent workers
    #[arg(short = 't', long = "threads", default_value_t = 10)]
    threads: usize,

    /// Only persist pages whose body contains this keyword
    #[arg(short, long)]
    key: Option<String>,

    /// SQLite database file for fetched pages
    #[arg(long, default_value = "spindle.db")]
    dbfile: String,

    /// In-memory frontier ceiling before jobs spill to disk
    #[arg(long, default_value_t = 500_000)]
    queue_ceiling: usize,

    /// Restrict traversal to the seed URL's host
    #[arg(long)]
    same_host: bool,

    /// Skip persisting page content entirely
    #[arg(long)]
    no_store: bool,

    /// Path to a TOML configuration file (replaces the flags above)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    validate_config(&config)?;

    run(config, cli.no_store).await?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spindle=info,warn"),
            1 => EnvFilter::new("spindle=debug,info"),
            2 => EnvFilter::new("spindle=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the effective configuration from a file or from flags
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
        return Ok(load_config(path)?);
    }

    let Some(url) = cli.url.clone() else {
        anyhow::bail!("a seed URL is required; pass --url or --config (see --help)");
    };

    Ok(Config {
        crawl: CrawlConfig {
            seed_url: url,
            max_depth: cli.depth,
            workers: cli.threads,
            queue_ceiling: cli.queue_ceiling,
            keyword: cli.key.clone(),
            same_host: cli.same_host,
        },
        fetch: FetchConfig::default(),
        storage: StorageConfig {
            database_path: cli.dbfile.clone(),
        },
    })
}

/// Wires up the collaborators and drives the crawl to completion
async fn run(config: Config, no_store: bool) -> Result<(), SpindleError> {
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let extractor = Arc::new(HtmlLinkExtractor);

    let mut step = CrawlStep::new(fetcher, extractor);
    if !no_store && !config.storage.database_path.is_empty() {
        let store = Arc::new(SqlitePageStore::new(
            Path::new(&config.storage.database_path),
            &config.crawl.seed_url,
            config.crawl.keyword.clone(),
        )?);
        step = step.with_store(store, config.crawl.keyword.clone());
    }

    let accept = build_accept(&config)?;

    let handle = Scheduler::new(step).with_accept(accept).start(
        &config.crawl.seed_url,
        config.crawl.max_depth,
        config.crawl.workers,
        config.crawl.queue_ceiling,
    )?;

    let progress = output::spawn_progress_reporter(handle.probe(), Duration::from_secs(1));

    // first Ctrl+C requests graceful shutdown; cancel is idempotent so
    // further interrupts are harmless while in-flight jobs settle
    let interrupt_probe = handle.probe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling crawl");
            interrupt_probe.cancel();
        }
    });

    let report = handle.wait().await;
    progress.abort();

    output::print_report(&report);

    if report.cancelled {
        tracing::info!("crawl cancelled by user");
    } else {
        tracing::info!("crawl completed");
    }

    Ok(())
}

/// Builds the traversal filter; restricts to the seed's host if requested
fn build_accept(config: &Config) -> Result<AcceptFn, SpindleError> {
    if !config.crawl.same_host {
        return Ok(Arc::new(|_| true));
    }

    let seed = Url::parse(&config.crawl.seed_url)?;
    let seed_host = seed
        .host_str()
        .ok_or_else(|| SpindleError::SeedWithoutHost(config.crawl.seed_url.clone()))?
        .to_string();

    Ok(Arc::new(move |target: &str| {
        Url::parse(target)
            .ok()
            .and_then(|u| u.host_str().map(|h| h == seed_host))
            .unwrap_or(false)
    }))
}
