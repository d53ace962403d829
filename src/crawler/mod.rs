//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The politeness gate (robots.txt and per-domain rate limits)
//! - HTTP fetching with typed failures
//! - HTML extraction of title, text and links
//! - The per-entry pipeline and the worker pool driving it

mod coordinator;
mod fetcher;
mod parser;
mod politeness;
mod scheduler;

pub use coordinator::{Admission, Coordinator, EntryOutcome};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage, MAX_REDIRECTS};
pub use parser::{extract_page, ParsedPage, PLACEHOLDER_TITLE};
pub use politeness::{Clearance, PolicyBlock, PolitenessGate};
pub use scheduler::{RunReport, Scheduler};

use crate::config::Config;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// Opens the configured database, seeds the frontier and runs the worker
/// pool until `cancel` fires (or the frontier drains under
/// `idle-policy = "stop"`).
///
/// # Example
///
/// ```no_run
/// use frontier_crawl::config::load_config;
/// use frontier_crawl::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// run_crawl(config, CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, cancel: CancellationToken) -> Result<RunReport, CrawlError> {
    let coordinator = Arc::new(Coordinator::open(config)?);
    let report = Scheduler::new(coordinator).run(cancel).await?;
    Ok(report)
}
