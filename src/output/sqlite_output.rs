//! SQLite result sink
//!
//! Each crawl becomes a row in `sessions`; every reported outcome becomes a
//! row in `outcomes`, including failures, so a finished crawl can be audited.

use crate::output::{FetchOutcome, ResultSink, SinkError, SinkResult};
use crate::storage::{SessionStatus, SqliteStorage, StorageError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Persists outcomes to a SQLite database
pub struct SqliteSink {
    storage: Mutex<SqliteStorage>,
    session_id: Mutex<Option<i64>>,
    root_url: String,
    config_hash: String,
    interrupted: AtomicBool,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    pub fn open(path: &Path, root_url: &str, config_hash: &str) -> SinkResult<Self> {
        let storage = SqliteStorage::new(path)?;
        Ok(Self::with_storage(storage, root_url, config_hash))
    }

    pub fn with_storage(storage: SqliteStorage, root_url: &str, config_hash: &str) -> Self {
        Self {
            storage: Mutex::new(storage),
            session_id: Mutex::new(None),
            root_url: root_url.to_string(),
            config_hash: config_hash.to_string(),
            interrupted: AtomicBool::new(false),
        }
    }

    /// The session created by `init`, if any
    pub fn session_id(&self) -> Option<i64> {
        self.session_id.lock().ok().and_then(|id| *id)
    }

    fn current_session(&self) -> SinkResult<i64> {
        self.session_id().ok_or(SinkError::NotInitialized)
    }
}

#[async_trait]
impl ResultSink for SqliteSink {
    async fn init(&self) -> SinkResult<()> {
        let id = {
            let mut storage = self.storage.lock().map_err(|_| StorageError::Poisoned)?;
            storage.create_session(&self.root_url, &self.config_hash)?
        };
        let mut session = self.session_id.lock().map_err(|_| StorageError::Poisoned)?;
        *session = Some(id);
        tracing::info!("Started crawl session #{}", id);
        Ok(())
    }

    async fn report(&self, outcome: &FetchOutcome) -> SinkResult<()> {
        let session_id = self.current_session()?;
        let mut storage = self.storage.lock().map_err(|_| StorageError::Poisoned)?;
        storage.insert_outcome(session_id, outcome)?;
        Ok(())
    }

    fn mark_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    async fn close(&self) -> SinkResult<()> {
        let session_id = self.current_session()?;
        let status = if self.interrupted.load(Ordering::SeqCst) {
            SessionStatus::Interrupted
        } else {
            SessionStatus::Completed
        };
        let mut storage = self.storage.lock().map_err(|_| StorageError::Poisoned)?;
        storage.finish_session(session_id, status)?;
        tracing::info!(
            "Finished crawl session #{} ({})",
            session_id,
            status.to_db_string()
        );
        Ok(())
    }
}
