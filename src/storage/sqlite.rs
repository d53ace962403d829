//! SQLite connection management and run metadata
//!
//! Every component that touches the database owns its own connection, all
//! opened through [`open_connection`] so they share the same pragmas.

use crate::storage::error::StorageResult;
use crate::storage::schema::initialize_schema;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// Upper bound on how long a statement waits for another connection's lock
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CONFIG_HASH_KEY: &str = "config_hash";

/// Opens (creating if needed) the database at `path`
///
/// The parent directory is created, WAL mode is enabled and the schema is
/// initialized. Safe to call once per component against the same file.
pub fn open_connection(path: &Path) -> StorageResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}

/// Creates a private in-memory database
///
/// Each call returns an independent database; use a temporary file when
/// several components must share state.
pub fn open_in_memory() -> StorageResult<Connection> {
    let conn = Connection::open_in_memory()?;
    initialize_schema(&conn)?;
    Ok(conn)
}

pub fn read_meta(conn: &Connection, key: &str) -> StorageResult<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn write_meta(conn: &Connection, key: &str, value: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Stores the configuration hash for this run
///
/// Returns the previous run's hash when it differs from `hash`, so the
/// caller can report that a resumed crawl runs under a changed config.
pub fn record_config_hash(conn: &Connection, hash: &str) -> StorageResult<Option<String>> {
    let previous = read_meta(conn, CONFIG_HASH_KEY)?;
    write_meta(conn, CONFIG_HASH_KEY, hash)?;
    Ok(previous.filter(|p| p != hash))
}
