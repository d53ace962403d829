use std::time::Duration;
use tokio::time::Instant;

/// Per-domain pacing state
///
/// Holds the last time a fetch against the domain was granted and the
/// minimum interval between two such fetches. Instants come from
/// `tokio::time` so paused-clock tests control them.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// When the last fetch was granted
    pub last_fetch_at: Option<Instant>,

    /// Minimum time between two fetches
    pub interval: Duration,

    /// Number of fetches granted so far in this run
    pub fetch_count: u64,
}

impl DomainState {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_fetch_at: None,
            interval,
            fetch_count: 0,
        }
    }

    /// Calculates the time until the next fetch may start
    ///
    /// Returns None if a fetch can be made now.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fetch_at?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            Some(self.interval - elapsed)
        } else {
            None
        }
    }

    /// Records a granted fetch
    pub fn reserve(&mut self, now: Instant) {
        self.last_fetch_at = Some(now);
        self.fetch_count += 1;
    }

    /// Widens the interval (e.g. after learning a robots Crawl-delay)
    ///
    /// The interval never shrinks below its current value.
    pub fn raise_interval(&mut self, interval: Duration) {
        self.interval = self.interval.max(interval);
    }
}
