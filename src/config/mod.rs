//! Configuration module for Frontier-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every tunable of the crawl (worker count, depth limits, politeness intervals,
//! extraction caps) lives here rather than in scattered constants.
//!
//! # Example
//!
//! ```no_run
//! use frontier_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractionConfig, IdlePolicy, NotifyConfig, PolitenessConfig,
    RateLimitAction, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
