//! Lifecycle states for frontier entries
//!
//! An entry moves `Pending -> InFlight` inside the frontier table, then
//! leaves it with one terminal [`VisitOutcome`] recorded in the visited
//! table. Nothing moves an entry back to `Pending` within a run.

use std::fmt;

/// State of an entry still held by the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Waiting in the frontier to be claimed
    Pending,

    /// Claimed by exactly one worker
    InFlight,
}

impl EntryState {
    /// Value stored in the frontier table's `state` column
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_flight" => Some(Self::InFlight),
            _ => None,
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::InFlight => "In Flight",
        };
        write!(f, "{}", s)
    }
}

/// The terminal outcome recorded for a visited URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitOutcome {
    Completed,
    Failed,
    SkippedByPolicy,
}

impl VisitOutcome {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::SkippedByPolicy => "skipped_by_policy",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "skipped_by_policy" => Some(Self::SkippedByPolicy),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Completed, Self::Failed, Self::SkippedByPolicy]
    }
}

impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::SkippedByPolicy => "Skipped By Policy",
        };
        write!(f, "{}", s)
    }
}
