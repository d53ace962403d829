//! Durable, deduplicated, bounded work queue
//!
//! Rows live in the `frontier` table in one of two states. `pending` rows
//! are waiting; `in_flight` rows have been claimed by exactly one worker
//! and are deleted by [`FrontierStore::complete`] once that worker is done.
//! Capacity bounds pending and in-flight rows together.

use crate::state::EntryState;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::sqlite::{open_connection, open_in_memory};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Re-poll period for waiters when no enqueue wakes them
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized absolute URL
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

pub struct FrontierStore {
    conn: Mutex<Connection>,
    capacity: u32,
    notify: Notify,
}

impl FrontierStore {
    /// Opens the frontier in the database at `path`
    ///
    /// Opening has no side effects, so a reader such as `--stats` can share
    /// the file with a running crawl. Call [`FrontierStore::recover_interrupted`]
    /// before starting workers.
    pub fn open(path: &Path, capacity: u32) -> StorageResult<Self> {
        Self::with_connection(open_connection(path)?, capacity)
    }

    pub fn open_in_memory(capacity: u32) -> StorageResult<Self> {
        Self::with_connection(open_in_memory()?, capacity)
    }

    fn with_connection(conn: Connection, capacity: u32) -> StorageResult<Self> {
        Ok(Self {
            conn: Mutex::new(conn),
            capacity,
            notify: Notify::new(),
        })
    }

    /// Purges rows left `in_flight` by an interrupted run
    ///
    /// Those entries were claimed but never finished, and are not retried.
    /// Only the process that owns the crawl may call this; any other live
    /// process would lose its claims.
    pub fn recover_interrupted(&self) -> StorageResult<usize> {
        let conn = self.conn.lock()?;
        let purged = conn.execute(
            "DELETE FROM frontier WHERE state = ?1",
            params![EntryState::InFlight.to_db_string()],
        )?;
        if purged > 0 {
            tracing::warn!(
                "Dropped {} in-flight frontier entries left by an interrupted run",
                purged
            );
        }
        Ok(purged)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Inserts `url` unless it is already queued or the store is full
    ///
    /// Returns `Ok(false)` for both refusals; callers treat that as "drop
    /// this link". Check and insert happen in one statement.
    pub fn try_enqueue(&self, url: &str, depth: u32) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let changed = {
            let conn = self.conn.lock()?;
            conn.execute(
                "INSERT INTO frontier (url, depth, state, enqueued_at)
                 SELECT ?1, ?2, ?5, ?3
                 WHERE (SELECT COUNT(*) FROM frontier) < ?4
                 ON CONFLICT(url) DO NOTHING",
                params![
                    url,
                    depth,
                    now,
                    self.capacity,
                    EntryState::Pending.to_db_string()
                ],
            )?
        };

        let accepted = changed == 1;
        if accepted {
            self.notify.notify_one();
        }
        Ok(accepted)
    }

    /// Claims the oldest pending entry without waiting
    ///
    /// The claim is a single `UPDATE ... RETURNING`, so two callers (even on
    /// different connections) can never receive the same row.
    pub fn try_dequeue(&self) -> StorageResult<Option<FrontierEntry>> {
        let conn = self.conn.lock()?;
        let entry = conn
            .query_row(
                "UPDATE frontier SET state = ?1
                 WHERE id = (SELECT id FROM frontier WHERE state = ?2 ORDER BY id LIMIT 1)
                 RETURNING url, depth",
                params![
                    EntryState::InFlight.to_db_string(),
                    EntryState::Pending.to_db_string()
                ],
                |row| {
                    Ok(FrontierEntry {
                        url: row.get(0)?,
                        depth: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Claims one entry, waiting up to `timeout` for one to appear
    ///
    /// Returns `Ok(None)` once the timeout elapses with nothing to claim.
    pub async fn dequeue(&self, timeout: Duration) -> StorageResult<Option<FrontierEntry>> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();

            if let Some(entry) = self.try_dequeue()? {
                return Ok(Some(entry));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let wait = (deadline - now).min(POLL_INTERVAL);
            let _ = tokio::time::timeout(wait, notified).await;
        }
    }

    /// Removes a claimed entry once it reached a terminal state
    pub fn complete(&self, url: &str) -> StorageResult<bool> {
        let conn = self.conn.lock()?;
        let removed = conn.execute(
            "DELETE FROM frontier WHERE url = ?1 AND state = ?2",
            params![url, EntryState::InFlight.to_db_string()],
        )?;
        Ok(removed == 1)
    }

    /// Outstanding entries (pending and in flight)
    pub fn size(&self) -> StorageResult<u64> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM frontier", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Entries still waiting to be claimed
    pub fn pending(&self) -> StorageResult<u64> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM frontier WHERE state = ?1",
            params![EntryState::Pending.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.size()? == 0)
    }

    /// Looks up the live entry for `url`, with its state
    pub fn get(&self, url: &str) -> StorageResult<Option<(FrontierEntry, EntryState)>> {
        let conn = self.conn.lock()?;
        let row = conn
            .query_row(
                "SELECT url, depth, state FROM frontier WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((url, depth, state)) => {
                let state = EntryState::from_db_string(&state)
                    .ok_or_else(|| StorageError::Corrupt(format!("frontier state '{}'", state)))?;
                Ok(Some((FrontierEntry { url, depth }, state)))
            }
        }
    }

    /// Pending entries in claim order
    pub fn snapshot(&self) -> StorageResult<Vec<FrontierEntry>> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT url, depth FROM frontier WHERE state = ?1 ORDER BY id")?;
        let entries = stmt
            .query_map(params![EntryState::Pending.to_db_string()], |row| {
                Ok(FrontierEntry {
                    url: row.get(0)?,
                    depth: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Drops every entry
    pub fn clear(&self) -> StorageResult<()> {
        let conn = self.conn.lock()?;
        conn.execute("DELETE FROM frontier", [])?;
        Ok(())
    }
}
