//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: Live state of a frontier entry (pending or in flight)
//! - `VisitOutcome`: Terminal outcome recorded in the visited index
//! - `DomainState`: Per-domain pacing for the politeness gate

mod domain_state;
mod entry_state;

// Re-export main types
pub use domain_state::DomainState;
pub use entry_state::{EntryState, VisitOutcome};
