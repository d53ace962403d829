//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite connection setup and schema management
//! - The durable frontier queue
//! - The visited index and its bounded cache
//! - Run metadata (schema version, configuration hash)

mod error;
mod frontier;
mod schema;
mod sqlite;
mod visited;

pub use error::{StorageError, StorageResult};
pub use frontier::{FrontierEntry, FrontierStore};
pub use schema::SCHEMA_VERSION;
pub use sqlite::{
    open_connection, open_in_memory, read_meta, record_config_hash, write_meta, BUSY_TIMEOUT,
};
pub use visited::{VisitedIndex, VisitedRecord};
