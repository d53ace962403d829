//! SQLite-backed page sink
//!
//! Completed pages are upserted into the `pages` table of the crawl
//! database, keyed by URL.

use crate::output::traits::{OutputResult, PageDocument, PageSink};
use crate::storage::{open_connection, open_in_memory, StorageError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

pub struct SqlitePageStore {
    conn: Mutex<Connection>,
}

impl SqlitePageStore {
    pub fn open(path: &Path) -> OutputResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_connection(path)?),
        })
    }

    pub fn open_in_memory() -> OutputResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_in_memory()?),
        })
    }

    pub fn get_page(&self, url: &str) -> OutputResult<Option<PageDocument>> {
        let conn = self.conn.lock().map_err(StorageError::from)?;
        let page = conn
            .query_row(
                "SELECT url, title, text FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageDocument {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        text: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(page)
    }

    pub fn count(&self) -> OutputResult<u64> {
        let conn = self.conn.lock().map_err(StorageError::from)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl PageSink for SqlitePageStore {
    fn upsert_page(&self, page: &PageDocument) -> OutputResult<()> {
        let conn = self.conn.lock().map_err(StorageError::from)?;
        conn.execute(
            "INSERT INTO pages (url, title, text, last_crawled_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO UPDATE SET
                 title = excluded.title,
                 text = excluded.text,
                 last_crawled_at = excluded.last_crawled_at",
            params![page.url, page.title, page.text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
