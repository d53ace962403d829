//! Output module: where completed pages go
//!
//! This module handles:
//! - The page sink interface and its SQLite implementation
//! - Best-effort webhook notification of processed pages
//! - Crawl statistics for the `--stats` report

mod notify;
mod sqlite_output;
pub mod stats;
mod traits;

pub use notify::WebhookNotifier;
pub use sqlite_output::SqlitePageStore;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, PageDocument, PageNotifier, PageSink};
