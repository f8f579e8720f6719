//! Result sink trait and error types

use crate::output::FetchOutcome;
use crate::storage::StorageError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur inside a result sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink used before init()")]
    NotInitialized,

    #[error("Sink is misconfigured: {0}")]
    Misconfigured(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index rejected document with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Receives one outcome per fetched URL
///
/// The lifecycle is scoped to one crawl session: `init` once before the first
/// report, `report` any number of times from concurrent workers in no
/// particular order, `close` once at the end. Implementations must be
/// thread-safe.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Acquires whatever the sink needs (connections, files, session rows)
    async fn init(&self) -> SinkResult<()> {
        Ok(())
    }

    /// Records a single outcome
    async fn report(&self, outcome: &FetchOutcome) -> SinkResult<()>;

    /// Called before `close` when the crawl stopped before its frontier was exhausted
    fn mark_interrupted(&self) {}

    /// Releases resources acquired in `init`
    async fn close(&self) -> SinkResult<()> {
        Ok(())
    }
}
