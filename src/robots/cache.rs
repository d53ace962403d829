//! Robots.txt caching implementation
//!
//! One entry per domain, valid for a configurable TTL. Fail-open results
//! are cached the same way so an unreachable robots.txt is not re-requested
//! on every fetch.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Cached robots.txt data for a domain
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,

    /// How long the entry stays valid
    pub ttl: Duration,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots, ttl: Duration) -> Self {
        Self::fetched_at(content, Utc::now(), ttl)
    }

    pub fn fetched_at(content: ParsedRobots, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            content,
            fetched_at,
            ttl,
        }
    }

    /// Checks if the entry has outlived its TTL
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at > self.ttl
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        self.content.is_allowed(url, agent)
    }

    pub fn crawl_delay(&self, agent: &str) -> Option<std::time::Duration> {
        self.content.crawl_delay(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_not_stale() {
        let cached = CachedRobots::new(ParsedRobots::allow_all(), Duration::hours(24));
        assert!(!cached.is_stale());
        assert!(cached.age() < Duration::seconds(5));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let fetched = Utc::now() - Duration::hours(25);
        let cached = CachedRobots::fetched_at(ParsedRobots::allow_all(), fetched, Duration::hours(24));
        assert!(cached.is_stale());

        let cached = CachedRobots::fetched_at(ParsedRobots::allow_all(), fetched, Duration::hours(48));
        assert!(!cached.is_stale());
    }

    #[test]
    fn test_stale_boundary() {
        let fetched = Utc::now();
        let cached = CachedRobots::fetched_at(ParsedRobots::allow_all(), fetched, Duration::hours(1));
        assert!(!cached.is_stale_at(fetched + Duration::hours(1)));
        assert!(cached.is_stale_at(fetched + Duration::hours(1) + Duration::seconds(1)));
    }

    #[test]
    fn test_delegates_to_rules() {
        let rules = ParsedRobots::from_content("User-agent: *\nDisallow: /admin\nCrawl-delay: 4");
        let cached = CachedRobots::new(rules, Duration::hours(24));
        assert!(!cached.is_allowed("https://example.com/admin", "TestBot"));
        assert!(cached.is_allowed("https://example.com/", "TestBot"));
        assert_eq!(
            cached.crawl_delay("TestBot"),
            Some(std::time::Duration::from_secs(4))
        );
    }
}
