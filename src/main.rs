//! Frontier-Crawl main entry point
//!
//! This is the command-line interface for the Frontier-Crawl web crawler.

use anyhow::Context;
use clap::Parser;
use frontier_crawl::config::{load_config_with_hash, Config};
use frontier_crawl::crawler::{Coordinator, Scheduler};
use frontier_crawl::output::{load_statistics, print_statistics, SqlitePageStore};
use frontier_crawl::storage::{open_connection, record_config_hash, FrontierStore, VisitedIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Frontier-Crawl: a polite, resumable web crawler
///
/// Frontier-Crawl fetches pages reachable from a seed set while respecting
/// robots.txt and per-domain rate limits. Its frontier and visited index
/// live in SQLite, so an interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "frontier-crawl")]
#[command(version)]
#[command(about = "A polite, resumable web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget the frontier and visited index before seeding
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("frontier_crawl=info,warn"),
            1 => EnvFilter::new("frontier_crawl=debug,info"),
            2 => EnvFilter::new("frontier_crawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Frontier-Crawl Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Workers: {}", crawler.concurrency);
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Cross-domain depth: {}", crawler.cross_domain_depth);
    println!("  Follow external links: {}", crawler.follow_external_links);
    println!("  Frontier capacity: {}", crawler.frontier_capacity);
    println!("  Fetch timeout: {:?}", crawler.fetch_timeout());
    println!("  Worker delay: {:?}", crawler.worker_delay());
    println!("  Idle policy: {:?}", crawler.idle_policy);
    println!("  Rate limit action: {:?}", crawler.rate_limit_action);
    println!("  Visited cache capacity: {}", crawler.visited_cache_capacity);

    println!("\nPoliteness:");
    println!("  Default interval: {:?}", config.politeness.default_interval());
    println!("  robots.txt TTL: {}h", config.politeness.robots_ttl_hours);
    let mut overrides: Vec<_> = config.politeness.overrides.iter().collect();
    overrides.sort();
    for (pattern, interval_ms) in overrides {
        println!("  - {}: {}ms", pattern, interval_ms);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nExtraction:");
    println!("  Max links per page: {}", config.extraction.max_links_per_page);
    println!("  Max text chars: {}", config.extraction.max_text_chars);
    println!("  Blacklist: {}", config.extraction.blacklist.join(", "));
    println!(
        "  Importance keywords: {}",
        config.extraction.importance_keywords.join(", ")
    );

    println!("\nDatabase: {}", config.storage.database_path);
    if let Some(notify) = &config.notify {
        println!("Webhook: {}", notify.webhook_url);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.storage.database_path);
    println!("Database: {}\n", path.display());

    let frontier = FrontierStore::open(path, config.crawler.frontier_capacity)
        .context("Failed to open frontier")?;
    let visited = VisitedIndex::open(path, config.crawler.visited_cache_capacity as usize)
        .context("Failed to open visited index")?;
    let pages = SqlitePageStore::open(path).context("Failed to open page store")?;

    let stats = load_statistics(&frontier, &visited, &pages)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    let path = PathBuf::from(&config.storage.database_path);
    {
        let conn = open_connection(&path)
            .with_context(|| format!("Cannot open database {}", path.display()))?;
        if let Some(previous) = record_config_hash(&conn, config_hash)? {
            tracing::warn!(
                "Configuration changed since the previous run ({} -> {})",
                previous,
                config_hash
            );
        }
    }

    let coordinator = Coordinator::open(config).context("Failed to initialize crawl state")?;
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
        coordinator.reset()?;
    } else {
        tracing::info!(
            "Resuming with {} entries in the frontier",
            coordinator.frontier().size()?
        );
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; finishing current work");
            on_signal.cancel();
        }
    });

    let scheduler = Scheduler::new(Arc::new(coordinator));
    let report = scheduler
        .run(cancel)
        .await
        .context("Crawl aborted: durable state unavailable")?;

    tracing::info!(
        "Crawl completed: {} entries processed in {:?}",
        report.processed,
        report.elapsed
    );
    Ok(())
}
