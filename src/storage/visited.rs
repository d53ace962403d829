//! Visited index: the single source of truth for "already processed"
//!
//! Lookups go through a concurrent in-memory cache first and fall back to
//! the `visited` table on a miss. The cache is bounded by clearing it
//! entirely once it grows past its capacity. That trades some extra
//! database lookups for a hard memory bound; it never changes an answer,
//! because the table stays authoritative.

use crate::state::VisitOutcome;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::sqlite::{open_connection, open_in_memory};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// A processed URL as stored in the `visited` table
#[derive(Debug, Clone, PartialEq)]
pub struct VisitedRecord {
    pub url: String,
    pub outcome: VisitOutcome,
    /// Free-form reason for failures and skips
    pub detail: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_crawled_at: DateTime<Utc>,
}

pub struct VisitedIndex {
    conn: Mutex<Connection>,
    cache: DashMap<String, ()>,
    cache_capacity: usize,
}

impl VisitedIndex {
    pub fn open(path: &Path, cache_capacity: usize) -> StorageResult<Self> {
        Ok(Self::with_connection(open_connection(path)?, cache_capacity))
    }

    pub fn open_in_memory(cache_capacity: usize) -> StorageResult<Self> {
        Ok(Self::with_connection(open_in_memory()?, cache_capacity))
    }

    fn with_connection(conn: Connection, cache_capacity: usize) -> Self {
        Self {
            conn: Mutex::new(conn),
            cache: DashMap::new(),
            cache_capacity,
        }
    }

    /// Has `url` been processed?
    ///
    /// Only positive answers are cached; a miss always reaches the table.
    pub fn contains(&self, url: &str) -> StorageResult<bool> {
        if self.cache.contains_key(url) {
            return Ok(true);
        }

        let found = {
            let conn = self.conn.lock()?;
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM visited WHERE url = ?1)",
                params![url],
                |row| row.get::<_, bool>(0),
            )?
        };

        if found {
            self.cache.insert(url.to_string(), ());
            self.enforce_capacity();
        }
        Ok(found)
    }

    /// Records a terminal outcome for `url`
    ///
    /// Repeating the call updates the outcome and `last_crawled_at` and
    /// keeps the original `first_seen_at`.
    pub fn mark_visited(
        &self,
        url: &str,
        outcome: VisitOutcome,
        detail: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        {
            let conn = self.conn.lock()?;
            conn.execute(
                "INSERT INTO visited (url, outcome, detail, first_seen_at, last_crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(url) DO UPDATE SET
                     outcome = excluded.outcome,
                     detail = excluded.detail,
                     last_crawled_at = excluded.last_crawled_at",
                params![url, outcome.to_db_string(), detail, now],
            )?;
        }

        self.cache.insert(url.to_string(), ());
        self.enforce_capacity();
        Ok(())
    }

    pub fn get(&self, url: &str) -> StorageResult<Option<VisitedRecord>> {
        let conn = self.conn.lock()?;
        let row = conn
            .query_row(
                "SELECT url, outcome, detail, first_seen_at, last_crawled_at
                 FROM visited WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, outcome, detail, first_seen_at, last_crawled_at)) = row else {
            return Ok(None);
        };

        Ok(Some(VisitedRecord {
            url,
            outcome: VisitOutcome::from_db_string(&outcome)
                .ok_or_else(|| StorageError::Corrupt(format!("visit outcome '{}'", outcome)))?,
            detail,
            first_seen_at: parse_timestamp(&first_seen_at)?,
            last_crawled_at: parse_timestamp(&last_crawled_at)?,
        }))
    }

    /// Number of visited URLs per outcome
    pub fn count_by_outcome(&self) -> StorageResult<HashMap<VisitOutcome, u64>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare("SELECT outcome, COUNT(*) FROM visited GROUP BY outcome")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (outcome, count) = row?;
            match VisitOutcome::from_db_string(&outcome) {
                Some(outcome) => {
                    counts.insert(outcome, count as u64);
                }
                None => tracing::warn!("Ignoring unknown visit outcome '{}'", outcome),
            }
        }
        Ok(counts)
    }

    pub fn len(&self) -> StorageResult<u64> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM visited", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries currently held in the in-memory cache
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Forgets every visited URL, durable and cached
    pub fn clear(&self) -> StorageResult<()> {
        {
            let conn = self.conn.lock()?;
            conn.execute("DELETE FROM visited", [])?;
        }
        self.cache.clear();
        Ok(())
    }

    fn enforce_capacity(&self) {
        let len = self.cache.len();
        if len > self.cache_capacity {
            self.cache.clear();
            tracing::debug!("Visited cache exceeded {} entries; cleared", self.cache_capacity);
        }
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("timestamp '{}': {}", value, e)))
}
