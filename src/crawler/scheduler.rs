//! Scheduler: a fixed pool of workers driving the coordinator
//!
//! This module handles:
//! - Spawning `concurrency` worker tasks sharing one [`Coordinator`]
//! - The fixed pacing delay after every entry
//! - Reseeding (or stopping) when the frontier runs dry
//! - Periodic progress reporting
//! - Cooperative shutdown through a [`CancellationToken`]

use crate::config::IdlePolicy;
use crate::crawler::coordinator::{Coordinator, EntryOutcome};
use crate::storage::StorageResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a finished run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Entries taken to a terminal state
    pub processed: u64,
    pub elapsed: Duration,
}

pub struct Scheduler {
    coordinator: Arc<Coordinator>,
}

impl Scheduler {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Seeds the frontier and runs workers until `cancel` fires
    ///
    /// With `idle-policy = "stop"` the run also ends once the frontier has
    /// no outstanding entries. Failing to seed is fatal; anything that goes
    /// wrong afterwards is handled per entry.
    pub async fn run(&self, cancel: CancellationToken) -> StorageResult<RunReport> {
        self.coordinator.seed()?;

        let concurrency = self.coordinator.config().crawler.concurrency.max(1);
        tracing::info!("Starting {} workers", concurrency);

        let started = Instant::now();
        let mut workers = JoinSet::new();
        for id in 0..concurrency {
            let coordinator = Arc::clone(&self.coordinator);
            let cancel = cancel.clone();
            workers.spawn(worker(id, coordinator, cancel, started));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }

        let report = RunReport {
            processed: self.coordinator.processed(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Crawl finished: {} entries processed in {:?}",
            report.processed,
            report.elapsed
        );
        Ok(report)
    }
}

async fn worker(id: u32, coordinator: Arc<Coordinator>, cancel: CancellationToken, started: Instant) {
    tracing::debug!("Worker {} started", id);
    let crawler = &coordinator.config().crawler;

    while !cancel.is_cancelled() {
        match coordinator.process_next(&cancel).await {
            Some(EntryOutcome::Abandoned) => break,
            Some(_) => {
                report_progress(&coordinator, started);
                if !pause(crawler.worker_delay(), &cancel).await {
                    break;
                }
            }
            None => {
                if cancel.is_cancelled() || !on_idle(&coordinator, &cancel).await {
                    break;
                }
            }
        }
    }

    tracing::debug!("Worker {} stopped", id);
}

/// Handles a dequeue that came back empty; returns false to stop the worker
async fn on_idle(coordinator: &Coordinator, cancel: &CancellationToken) -> bool {
    let outstanding = match coordinator.frontier().size() {
        Ok(size) => size,
        Err(e) => {
            tracing::error!("Cannot read frontier size: {}", e);
            return true;
        }
    };
    // Entries still in flight elsewhere may yet produce children
    if outstanding > 0 {
        return true;
    }

    let crawler = &coordinator.config().crawler;
    match crawler.idle_policy {
        IdlePolicy::Stop => {
            tracing::info!("Frontier drained; stopping");
            cancel.cancel();
            false
        }
        IdlePolicy::Reseed => {
            tracing::info!(
                "Frontier empty; reseeding in {:?}",
                crawler.reseed_interval()
            );
            if !pause(crawler.reseed_interval(), cancel).await {
                return false;
            }
            if let Err(e) = coordinator.seed() {
                tracing::error!("Reseed failed: {}", e);
            }
            true
        }
    }
}

fn report_progress(coordinator: &Coordinator, started: Instant) {
    let interval = coordinator.config().crawler.progress_interval;
    let processed = coordinator.processed();
    if interval == 0 || processed == 0 || processed % interval != 0 {
        return;
    }

    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        processed as f64 / elapsed
    } else {
        0.0
    };
    let frontier = coordinator
        .frontier()
        .size()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "?".to_string());
    tracing::info!(
        "Progress: {} entries processed, {} in frontier, {} domains, {:.2} pages/sec",
        processed,
        frontier,
        coordinator.gate().domain_count(),
        rate
    );
}

/// Sleeps for `duration`; returns false if cancelled first
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
