//! Output sink traits and types
//!
//! This module defines the interfaces through which completed pages leave
//! the crawl core: a durable page sink (upsert by URL) and an optional
//! fire-and-forget notifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<rusqlite::Error> for OutputError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into())
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A completed page as handed to sinks and notifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub url: String,
    pub title: String,
    pub text: String,
}

impl PageDocument {
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Durable destination for completed pages
///
/// Writes are keyed by URL and must be idempotent: delivery is
/// at-least-once, so the same page may arrive more than once across
/// restarts. Implementations must be thread-safe.
pub trait PageSink: Send + Sync {
    /// Inserts or replaces the page stored under `page.url`
    fn upsert_page(&self, page: &PageDocument) -> OutputResult<()>;
}

/// Best-effort announcement of newly processed pages
///
/// Failures are reported to the caller for logging only; they never fail
/// or delay the crawl.
#[async_trait]
pub trait PageNotifier: Send + Sync {
    async fn notify(&self, page: &PageDocument) -> OutputResult<()>;
}
