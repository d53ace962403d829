//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate (Google's
//! matcher). `Crawl-delay` is not part of that matcher, so it is read here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Crawl-delay values above this are clamped; a hostile robots.txt must not
/// be able to park a worker for hours.
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(120);

/// Parsed robots.txt data for one domain
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw body; None means every path is allowed
    body: Option<String>,
}

impl ParsedRobots {
    /// Wraps a fetched robots.txt body
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            return Self::allow_all();
        }
        Self {
            body: Some(content.to_string()),
        }
    }

    /// A ruleset that allows everything
    ///
    /// Used when robots.txt is missing, unreachable or not a 200.
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.body.is_none()
    }

    /// Checks if a URL is allowed for the given user agent product token
    ///
    /// `url` may be absolute or a bare path; the matcher only looks at the
    /// path and query.
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        match &self.body {
            None => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, agent, url)
            }
        }
    }

    /// Gets the Crawl-delay that applies to `agent`
    ///
    /// A group naming the agent wins over the `*` group. Unparseable or
    /// negative values are ignored.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        let body = self.body.as_deref()?;
        let agent = agent.to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut specific: Option<f64> = None;
        let mut wildcard: Option<f64> = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive User-agent lines share one group
                if !in_agent_lines {
                    group_agents.clear();
                }
                group_agents.push(value.to_lowercase());
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };
            if !delay.is_finite() || delay < 0.0 {
                continue;
            }

            if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                specific = Some(delay);
            } else if group_agents.iter().any(|ua| ua == "*") {
                wildcard = Some(delay);
            }
        }

        specific
            .or(wildcard)
            .map(|secs| Duration::from_secs_f64(secs.min(MAX_CRAWL_DELAY.as_secs_f64())))
    }
}
