//! Storage module for persisting crawl results
//!
//! This module handles the SQLite database behind the sqlite result sink:
//! - Schema initialization
//! - Crawl session tracking (start, finish, status, config hash)
//! - One row per reported fetch outcome
//! - Aggregate counts for the `--stats` mode

mod schema;
mod sqlite;

pub use sqlite::SqliteStorage;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Represents a crawl session in the database
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub root_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: SessionStatus,
}

/// Status of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Interrupted,
}

impl SessionStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

/// Aggregate outcome counts for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub total: u64,
    pub with_text: u64,
    pub failed: u64,
    /// Failure reasons with their counts, most frequent first
    pub failure_reasons: Vec<(String, u64)>,
}

impl OutcomeCounts {
    /// Returns the share of outcomes that carried text, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.with_text as f64 / self.total as f64) * 100.0
    }
}
