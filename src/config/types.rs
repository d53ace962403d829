use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure for Frontier-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Ordered list of start URLs, all at depth 0
    pub seeds: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub politeness: PolitenessConfig,

    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    pub storage: StorageConfig,

    #[serde(default)]
    pub notify: Option<NotifyConfig>,
}

/// What a worker does once the frontier runs dry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdlePolicy {
    /// Wait for the reseed interval, then offer the seeds again
    Reseed,
    /// Stop the whole run once nothing is outstanding
    Stop,
}

/// What a worker does with an entry whose domain is still inside its rate window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitAction {
    /// Sleep until the window opens, then fetch
    Wait,
    /// Drop the entry without recording it as visited
    Drop,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub concurrency: u32,

    /// Maximum depth to crawl from seed URLs
    pub max_depth: u32,

    /// Depth given to a link that leaves the parent's registrable domain
    pub cross_domain_depth: u32,

    /// Whether links to other registrable domains are followed at all
    pub follow_external_links: bool,

    /// Maximum number of outstanding frontier entries
    pub frontier_capacity: u32,

    /// Per-request timeout (milliseconds)
    pub fetch_timeout_ms: u64,

    /// How long a single dequeue waits for work (milliseconds)
    pub dequeue_timeout_ms: u64,

    /// Fixed pause after each processed entry (milliseconds)
    pub worker_delay_ms: u64,

    /// Wait before reseeding an empty frontier (milliseconds)
    pub reseed_interval_ms: u64,

    pub idle_policy: IdlePolicy,

    pub rate_limit_action: RateLimitAction,

    /// Entry cap for the visited index's in-memory cache
    pub visited_cache_capacity: u32,

    /// Log a progress line every N processed entries
    pub progress_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_depth: 3,
            cross_domain_depth: 1,
            follow_external_links: true,
            frontier_capacity: 10_000,
            fetch_timeout_ms: 20_000,
            dequeue_timeout_ms: 2_000,
            worker_delay_ms: 3_000,
            reseed_interval_ms: 30_000,
            idle_policy: IdlePolicy::Reseed,
            rate_limit_action: RateLimitAction::Wait,
            visited_cache_capacity: 100_000,
            progress_interval: 10,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn worker_delay(&self) -> Duration {
        Duration::from_millis(self.worker_delay_ms)
    }

    pub fn reseed_interval(&self) -> Duration {
        Duration::from_millis(self.reseed_interval_ms)
    }
}

/// Robots.txt and rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolitenessConfig {
    /// Minimum time between two fetches against the same domain (milliseconds)
    pub default_interval_ms: u64,

    /// Timeout for a robots.txt fetch (milliseconds)
    pub robots_timeout_ms: u64,

    /// How long a fetched robots.txt stays valid (hours)
    pub robots_ttl_hours: u32,

    /// Per-domain interval overrides, keyed by domain pattern (e.g. "*.gov.in")
    pub overrides: HashMap<String, u64>,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 3_000,
            robots_timeout_ms: 5_000,
            robots_ttl_hours: 24,
            overrides: HashMap::new(),
        }
    }
}

impl PolitenessConfig {
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.robots_timeout_ms)
    }

    pub fn robots_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.robots_ttl_hours))
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Page extraction and link filtering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionConfig {
    /// Maximum number of outbound links kept per page
    pub max_links_per_page: u32,

    /// Maximum number of characters of page text kept
    pub max_text_chars: u32,

    /// Domain patterns whose links are never followed
    pub blacklist: Vec<String>,

    /// Keywords that make a link preferred when the per-page cap applies
    pub importance_keywords: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_links_per_page: 30,
            max_text_chars: 8_000,
            blacklist: vec![
                "*.facebook.com".to_string(),
                "*.twitter.com".to_string(),
                "*.x.com".to_string(),
                "*.instagram.com".to_string(),
                "*.linkedin.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            importance_keywords: Vec::new(),
        }
    }
}

/// Durable storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Outbound notification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifyConfig {
    /// Endpoint receiving one JSON document per processed page
    pub webhook_url: String,

    /// Delivery timeout (milliseconds)
    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_notify_timeout_ms() -> u64 {
    10_000
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
