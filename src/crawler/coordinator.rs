//! Crawl coordinator: the per-entry pipeline
//!
//! One call to [`Coordinator::process_next`] claims a single frontier entry
//! and drives it to a terminal state:
//!
//! 1. Dequeue (atomic claim; the row becomes `in_flight`)
//! 2. Visited check (another path may have processed the URL meanwhile)
//! 3. Politeness gate (robots.txt, then the domain's rate limit)
//! 4. Fetch and extract
//! 5. On success: page sink upsert, detached notification,
//!    `mark_visited(Completed)`, child admission
//! 6. Remove the claimed row from the frontier
//!
//! Every error is caught here and reported as an [`EntryOutcome`]; nothing
//! escapes to the worker loop.

use crate::config::{Config, RateLimitAction};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError};
use crate::crawler::politeness::{Clearance, PolicyBlock, PolitenessGate};
use crate::output::{PageDocument, PageNotifier, PageSink, SqlitePageStore, WebhookNotifier};
use crate::robots::{HttpRobotsFetcher, RobotsFetcher};
use crate::state::VisitOutcome;
use crate::storage::{FrontierEntry, FrontierStore, StorageResult, VisitedIndex};
use crate::url::{child_depth, link_scope, normalize_url, LinkScope};
use crate::CrawlError;
use reqwest::Client;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Already has a terminal outcome
    AlreadyVisited,
    /// Already queued, or the frontier is full
    Rejected,
    /// Deeper than `max-depth`
    TooDeep,
    /// Not a crawlable http(s) URL
    Invalid,
}

/// How one frontier entry ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Page stored and marked visited; children offered to the frontier
    Completed { accepted: usize, rejected: usize },
    /// Fetch failed; marked visited as failed
    Failed(FetchError),
    /// Blocked by the politeness gate
    Skipped(PolicyBlock),
    /// Processed through another path before this claim
    AlreadyVisited,
    /// A durable write failed; the entry is dropped for this cycle
    PersistenceFailed(String),
    /// Shutdown interrupted the entry; its row stays `in_flight`
    Abandoned,
}

pub struct Coordinator {
    config: Arc<Config>,
    frontier: Arc<FrontierStore>,
    visited: Arc<VisitedIndex>,
    gate: PolitenessGate,
    client: Client,
    sink: Arc<dyn PageSink>,
    notifier: Option<Arc<dyn PageNotifier>>,
    processed: AtomicU64,
}

impl Coordinator {
    /// Creates a coordinator over existing stores
    ///
    /// robots.txt is fetched over HTTP with the crawler's own client; see
    /// [`Coordinator::with_robots_fetcher`] to replace that.
    pub fn new(
        config: Config,
        frontier: Arc<FrontierStore>,
        visited: Arc<VisitedIndex>,
        sink: Arc<dyn PageSink>,
    ) -> Result<Self, CrawlError> {
        let client = build_http_client(&config.user_agent)?;
        let robots: Arc<dyn RobotsFetcher> = Arc::new(HttpRobotsFetcher::new(
            client.clone(),
            config.politeness.robots_timeout(),
        ));
        let gate = PolitenessGate::new(
            robots,
            &config.politeness,
            config.user_agent.crawler_name.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            frontier,
            visited,
            gate,
            client,
            sink,
            notifier: None,
            processed: AtomicU64::new(0),
        })
    }

    /// Opens every store in the configured database and wires the notifier
    ///
    /// Failing to open the database is fatal: without durable dedup state
    /// the crawl cannot make progress.
    pub fn open(config: Config) -> Result<Self, CrawlError> {
        let path = Path::new(&config.storage.database_path).to_path_buf();
        tracing::info!("Opening crawl database at {}", path.display());

        let frontier = Arc::new(FrontierStore::open(&path, config.crawler.frontier_capacity)?);
        frontier.recover_interrupted()?;
        let visited = Arc::new(VisitedIndex::open(
            &path,
            config.crawler.visited_cache_capacity as usize,
        )?);
        let sink: Arc<dyn PageSink> = Arc::new(SqlitePageStore::open(&path)?);
        let notify = config.notify.clone();

        let coordinator = Self::new(config, frontier, visited, sink)?;
        Ok(match notify {
            Some(notify) => {
                tracing::info!("Notifying {} of processed pages", notify.webhook_url);
                let notifier = WebhookNotifier::from_config(coordinator.client.clone(), &notify);
                coordinator.with_notifier(Arc::new(notifier))
            }
            None => coordinator,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn PageNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_robots_fetcher(mut self, fetcher: Arc<dyn RobotsFetcher>) -> Self {
        self.gate = PolitenessGate::new(
            fetcher,
            &self.config.politeness,
            self.config.user_agent.crawler_name.clone(),
        );
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn frontier(&self) -> &FrontierStore {
        &self.frontier
    }

    pub fn visited(&self) -> &VisitedIndex {
        &self.visited
    }

    pub fn gate(&self) -> &PolitenessGate {
        &self.gate
    }

    /// Entries taken to a terminal state so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Forgets all frontier and visited state
    pub fn reset(&self) -> StorageResult<()> {
        self.frontier.clear()?;
        self.visited.clear()?;
        tracing::info!("Cleared frontier and visited index");
        Ok(())
    }

    /// Offers every configured seed at depth 0
    ///
    /// Safe to repeat: seeds already queued or visited are turned away by
    /// the same checks that apply to discovered links. Returns the number
    /// accepted.
    pub fn seed(&self) -> StorageResult<usize> {
        let mut accepted = 0;
        for seed in &self.config.seeds {
            match self.offer(seed, 0)? {
                Admission::Accepted => accepted += 1,
                Admission::Invalid => tracing::warn!("Ignoring invalid seed {}", seed),
                other => tracing::debug!("Seed {} not queued: {:?}", seed, other),
            }
        }
        tracing::info!(
            "Seeded frontier with {} of {} URLs",
            accepted,
            self.config.seeds.len()
        );
        Ok(accepted)
    }

    /// Normalizes `url` and tries to queue it at `depth`
    pub fn offer(&self, url: &str, depth: u32) -> StorageResult<Admission> {
        match normalize_url(url) {
            Ok(normalized) => self.admit(&normalized, depth),
            Err(e) => {
                tracing::debug!("Rejecting {}: {}", url, e);
                Ok(Admission::Invalid)
            }
        }
    }

    fn admit(&self, url: &Url, depth: u32) -> StorageResult<Admission> {
        if depth > self.config.crawler.max_depth {
            return Ok(Admission::TooDeep);
        }
        if self.visited.contains(url.as_str())? {
            return Ok(Admission::AlreadyVisited);
        }
        if self.frontier.try_enqueue(url.as_str(), depth)? {
            Ok(Admission::Accepted)
        } else {
            Ok(Admission::Rejected)
        }
    }

    /// Claims one entry and drives it to a terminal state
    ///
    /// Returns None when nothing could be dequeued within the configured
    /// dequeue timeout, or when `cancel` fired while waiting.
    pub async fn process_next(&self, cancel: &CancellationToken) -> Option<EntryOutcome> {
        let claimed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            claimed = self.frontier.dequeue(self.config.crawler.dequeue_timeout()) => claimed,
        };

        let entry = match claimed {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Frontier dequeue failed: {}", e);
                return Some(EntryOutcome::PersistenceFailed(e.to_string()));
            }
        };

        tracing::debug!("Processing {} (depth {})", entry.url, entry.depth);
        let outcome = self.process_entry(&entry, cancel).await;

        if outcome != EntryOutcome::Abandoned {
            if let Err(e) = self.frontier.complete(&entry.url) {
                tracing::error!("Failed to release frontier entry {}: {}", entry.url, e);
            }
            self.processed.fetch_add(1, Ordering::Relaxed);
        }

        log_outcome(&entry, &outcome);
        Some(outcome)
    }

    async fn process_entry(&self, entry: &FrontierEntry, cancel: &CancellationToken) -> EntryOutcome {
        let url = match Url::parse(&entry.url) {
            Ok(url) => url,
            Err(e) => {
                let error = FetchError::Parse(format!("stored URL does not parse: {}", e));
                let detail = error.to_string();
                return self.finish(entry, VisitOutcome::Failed, &detail, EntryOutcome::Failed(error));
            }
        };

        match self.visited.contains(&entry.url) {
            Ok(true) => return EntryOutcome::AlreadyVisited,
            Ok(false) => {}
            Err(e) => return EntryOutcome::PersistenceFailed(e.to_string()),
        }

        let clearance = match self.config.crawler.rate_limit_action {
            RateLimitAction::Wait => self.gate.acquire(&url, cancel).await,
            RateLimitAction::Drop => self.gate.check(&url).await,
        };
        match clearance {
            Clearance::Granted => {}
            Clearance::Denied(block) => {
                let detail = block.to_string();
                let outcome = EntryOutcome::Skipped(block);
                return self.finish(entry, VisitOutcome::SkippedByPolicy, &detail, outcome);
            }
            Clearance::Wait(_) if cancel.is_cancelled() => return EntryOutcome::Abandoned,
            Clearance::Wait(wait) => {
                // Dropped without a visited record so a later rediscovery can retry it
                return EntryOutcome::Skipped(PolicyBlock::RateLimited { wait });
            }
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return EntryOutcome::Abandoned,
            fetched = fetch_page(
                &self.client,
                &url,
                self.config.crawler.fetch_timeout(),
                &self.config.extraction,
            ) => fetched,
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(error) => {
                let detail = error.to_string();
                return self.finish(entry, VisitOutcome::Failed, &detail, EntryOutcome::Failed(error));
            }
        };

        let document = PageDocument::new(
            entry.url.clone(),
            fetched.page.title.clone(),
            fetched.page.text.clone(),
        );
        if let Err(e) = self.sink.upsert_page(&document) {
            tracing::error!("Page sink rejected {}: {}", entry.url, e);
            return EntryOutcome::PersistenceFailed(e.to_string());
        }
        self.notify(document);

        if let Err(e) = self.visited.mark_visited(&entry.url, VisitOutcome::Completed, None) {
            tracing::error!("Failed to mark {} visited: {}", entry.url, e);
            return EntryOutcome::PersistenceFailed(e.to_string());
        }

        let (accepted, rejected) = self.admit_children(entry, &fetched.final_url, &fetched.page.links);
        EntryOutcome::Completed { accepted, rejected }
    }

    /// Offers a page's links; returns (accepted, rejected)
    fn admit_children(&self, entry: &FrontierEntry, page_url: &Url, links: &[Url]) -> (usize, usize) {
        let crawler = &self.config.crawler;
        let mut accepted = 0;
        let mut rejected = 0;

        for link in links {
            let scope = link_scope(page_url, link);
            if scope == LinkScope::CrossSite && !crawler.follow_external_links {
                rejected += 1;
                continue;
            }

            let depth = child_depth(page_url, entry.depth, link, crawler.cross_domain_depth);
            match self.admit(link, depth) {
                Ok(Admission::Accepted) => accepted += 1,
                Ok(admission) => {
                    tracing::trace!("Not queueing {}: {:?}", link, admission);
                    rejected += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to queue {}: {}", link, e);
                    rejected += 1;
                }
            }
        }

        (accepted, rejected)
    }

    /// Records a terminal non-success outcome, then returns `outcome`
    fn finish(
        &self,
        entry: &FrontierEntry,
        visit: VisitOutcome,
        detail: &str,
        outcome: EntryOutcome,
    ) -> EntryOutcome {
        match self.visited.mark_visited(&entry.url, visit, Some(detail)) {
            Ok(()) => outcome,
            Err(e) => {
                tracing::error!("Failed to mark {} {}: {}", entry.url, visit, e);
                EntryOutcome::PersistenceFailed(e.to_string())
            }
        }
    }

    fn notify(&self, document: PageDocument) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let notifier = Arc::clone(notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&document).await {
                tracing::warn!("Notification for {} failed: {}", document.url, e);
            }
        });
    }
}

fn log_outcome(entry: &FrontierEntry, outcome: &EntryOutcome) {
    match outcome {
        EntryOutcome::Completed { accepted, rejected } => tracing::info!(
            "Crawled {} (depth {}): {} links queued, {} dropped",
            entry.url,
            entry.depth,
            accepted,
            rejected
        ),
        EntryOutcome::Failed(e) => tracing::warn!("Failed {}: {}", entry.url, e),
        EntryOutcome::Skipped(block) => tracing::info!("Skipped {}: {}", entry.url, block),
        EntryOutcome::AlreadyVisited => tracing::debug!("{} already visited", entry.url),
        EntryOutcome::PersistenceFailed(e) => {
            tracing::error!("Persistence failure on {}: {}", entry.url, e)
        }
        EntryOutcome::Abandoned => tracing::debug!("Abandoned {} on shutdown", entry.url),
    }
}
