//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::output::sqlite_output::SqlitePageStore;
use crate::output::traits::OutputResult;
use crate::state::VisitOutcome;
use crate::storage::{FrontierStore, VisitedIndex};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Entries waiting in the frontier
    pub frontier_pending: u64,

    /// Entries claimed by a worker and not yet finished
    pub frontier_in_flight: u64,

    /// Visited URLs by outcome
    pub visited_by_outcome: HashMap<VisitOutcome, u64>,

    /// Pages held by the page store
    pub pages_stored: u64,
}

impl CrawlStatistics {
    pub fn total_visited(&self) -> u64 {
        self.visited_by_outcome.values().sum()
    }

    pub fn count(&self, outcome: VisitOutcome) -> u64 {
        self.visited_by_outcome.get(&outcome).copied().unwrap_or(0)
    }

    /// Share of visited URLs that completed, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total_visited();
        if total == 0 {
            return 0.0;
        }
        (self.count(VisitOutcome::Completed) as f64 / total as f64) * 100.0
    }
}

/// Loads statistics from storage
pub fn load_statistics(
    frontier: &FrontierStore,
    visited: &VisitedIndex,
    pages: &SqlitePageStore,
) -> OutputResult<CrawlStatistics> {
    let size = frontier.size()?;
    let pending = frontier.pending()?;

    Ok(CrawlStatistics {
        frontier_pending: pending,
        frontier_in_flight: size.saturating_sub(pending),
        visited_by_outcome: visited.count_by_outcome()?,
        pages_stored: pages.count()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Frontier:");
    println!("  Pending: {}", stats.frontier_pending);
    println!("  In flight: {}", stats.frontier_in_flight);
    println!();

    let total = stats.total_visited();
    println!("Visited ({}):", total);
    for outcome in VisitOutcome::all() {
        let count = stats.count(outcome);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!();

    println!("Pages stored: {}", stats.pages_stored);
    println!(
        "Success Rate: {:.1}% ({} / {} URLs completed)",
        stats.success_rate(),
        stats.count(VisitOutcome::Completed),
        total
    );
}
