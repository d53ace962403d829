//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Fetching sits behind the [`RobotsFetcher`] trait so the politeness gate can be
//! exercised without a network.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Source of robots.txt rulesets
///
/// Implementations never fail: anything short of a readable 200 response
/// yields [`ParsedRobots::allow_all`].
#[async_trait]
pub trait RobotsFetcher: Send + Sync {
    async fn fetch(&self, robots_url: &Url) -> ParsedRobots;
}

/// Builds the robots.txt location for the origin of `url`
///
/// Returns None for URLs without a host.
///
/// ```
/// use url::Url;
/// use frontier_crawl::robots::robots_url;
///
/// let page = Url::parse("http://127.0.0.1:8080/a/b?q=1").unwrap();
/// assert_eq!(
///     robots_url(&page).unwrap().as_str(),
///     "http://127.0.0.1:8080/robots.txt"
/// );
/// ```
pub fn robots_url(url: &Url) -> Option<Url> {
    url.host_str()?;
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    let _ = robots.set_username("");
    let _ = robots.set_password(None);
    Some(robots)
}

/// Fetches robots.txt over HTTP with a short timeout
pub struct HttpRobotsFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpRobotsFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl RobotsFetcher for HttpRobotsFetcher {
    async fn fetch(&self, robots_url: &Url) -> ParsedRobots {
        let response = match self
            .client
            .get(robots_url.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(
                "robots.txt at {} returned {}, allowing all",
                robots_url,
                response.status()
            );
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                tracing::debug!("robots.txt body unreadable at {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
