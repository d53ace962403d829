//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Frontier-Crawl database.

/// Bumped whenever a table definition changes
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Outstanding work: at most one row per normalized URL
CREATE TABLE IF NOT EXISTS frontier (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    depth INTEGER NOT NULL CHECK (depth >= 0),
    state TEXT NOT NULL CHECK (state IN ('pending', 'in_flight')),
    enqueued_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_frontier_state ON frontier(state, id);

-- Authoritative record of processed URLs
CREATE TABLE IF NOT EXISTS visited (
    url TEXT PRIMARY KEY,
    outcome TEXT NOT NULL,
    detail TEXT,
    first_seen_at TEXT NOT NULL,
    last_crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_visited_outcome ON visited(outcome);

-- Page sink: extracted content, upserted by URL
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    last_crawled_at TEXT NOT NULL
);

-- Run metadata (schema version, configuration hash)
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO NOTHING",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
