//! Politeness gate: robots.txt compliance and per-domain rate limits
//!
//! Every fetch must be cleared here first. State is kept per domain key
//! (host plus explicit port) in a sharded map of slots, so workers only
//! contend when they target the same domain.
//!
//! Each slot has two async locks. The robots lock is held across the
//! robots.txt fetch, which makes that fetch single-flight: concurrent first
//! requests to a domain wait for the one in progress and reuse its result.
//! The pacing lock guards the last-fetch timestamp; a granted check
//! reserves the slot before releasing it.

use crate::config::PolitenessConfig;
use crate::robots::{robots_url, CachedRobots, ParsedRobots, RobotsFetcher};
use crate::state::DomainState;
use crate::url::{domain_key, extract_domain, PatternMap};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why the gate refused a fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyBlock {
    #[error("disallowed by robots.txt")]
    RobotsDisallowed,

    #[error("rate limited for another {wait:?}")]
    RateLimited { wait: Duration },
}

/// Answer to "may I fetch this URL now?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clearance {
    /// Fetch now; the domain's slot has been reserved
    Granted,
    /// Ask again after this long
    Wait(Duration),
    /// Do not fetch
    Denied(PolicyBlock),
}

struct DomainSlot {
    robots: Mutex<Option<CachedRobots>>,
    pacing: Mutex<DomainState>,
}

pub struct PolitenessGate {
    fetcher: Arc<dyn RobotsFetcher>,
    slots: DashMap<String, Arc<DomainSlot>>,
    overrides: PatternMap<u64>,
    default_interval: Duration,
    robots_ttl: chrono::Duration,
    agent: String,
}

impl PolitenessGate {
    /// Creates a gate
    ///
    /// `agent` is the product token matched against robots.txt
    /// `User-agent` lines (the crawler name, without version).
    pub fn new(
        fetcher: Arc<dyn RobotsFetcher>,
        config: &PolitenessConfig,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            slots: DashMap::new(),
            overrides: PatternMap::new(config.overrides.iter().map(|(k, v)| (k, *v))),
            default_interval: config.default_interval(),
            robots_ttl: config.robots_ttl(),
            agent: agent.into(),
        }
    }

    pub fn with_robots_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.robots_ttl = ttl;
        self
    }

    /// Configured minimum interval for `host`, before any Crawl-delay
    pub fn interval_for(&self, host: &str) -> Duration {
        self.overrides
            .lookup(host)
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or(self.default_interval)
    }

    /// Number of domains seen so far
    pub fn domain_count(&self) -> usize {
        self.slots.len()
    }

    /// Decides whether `url` may be fetched now
    ///
    /// A `Granted` answer counts as a fetch against the domain: the caller
    /// must fetch immediately or waste the slot.
    pub async fn check(&self, url: &Url) -> Clearance {
        let key = domain_key(url).unwrap_or_default();
        let slot = self.slot(&key, url);

        let (allowed, crawl_delay) = self.consult_robots(&slot, url).await;
        if !allowed {
            tracing::debug!("{} disallowed by robots.txt", url);
            return Clearance::Denied(PolicyBlock::RobotsDisallowed);
        }

        let mut pacing = slot.pacing.lock().await;
        if let Some(delay) = crawl_delay {
            pacing.raise_interval(delay);
        }

        let now = Instant::now();
        match pacing.time_until_next(now) {
            Some(wait) => Clearance::Wait(wait),
            None => {
                pacing.reserve(now);
                Clearance::Granted
            }
        }
    }

    /// Waits until `url` is granted or denied
    ///
    /// Returns `Granted` or `Denied`, or the outstanding `Wait` if `cancel`
    /// fired first.
    pub async fn acquire(&self, url: &Url, cancel: &CancellationToken) -> Clearance {
        loop {
            match self.check(url).await {
                Clearance::Wait(wait) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Clearance::Wait(wait),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                decided => return decided,
            }
        }
    }

    fn slot(&self, key: &str, url: &Url) -> Arc<DomainSlot> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }

        let host = extract_domain(url).unwrap_or_default();
        let interval = self.interval_for(&host);
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(DomainSlot {
                    robots: Mutex::new(None),
                    pacing: Mutex::new(DomainState::new(interval)),
                })
            })
            .value()
            .clone();
        slot
    }

    /// Returns (allowed, crawl delay), fetching robots.txt if needed
    async fn consult_robots(&self, slot: &DomainSlot, url: &Url) -> (bool, Option<Duration>) {
        let mut cached = slot.robots.lock().await;

        let fresh = cached.as_ref().is_some_and(|robots| !robots.is_stale());
        if !fresh {
            let rules = match robots_url(url) {
                Some(location) => {
                    tracing::debug!("Fetching {}", location);
                    self.fetcher.fetch(&location).await
                }
                None => ParsedRobots::allow_all(),
            };
            *cached = Some(CachedRobots::new(rules, self.robots_ttl));
        }

        match cached.as_ref() {
            Some(robots) => (
                robots.is_allowed(url.as_str(), &self.agent),
                robots.crawl_delay(&self.agent),
            ),
            None => (true, None),
        }
    }
}
