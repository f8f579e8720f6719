//! SQLite storage implementation

use crate::output::FetchOutcome;
use crate::storage::schema::initialize_schema;
use crate::storage::{
    OutcomeCounts, SessionRecord, SessionStatus, StorageError, StorageResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and initializes the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Session Management =====

    /// Creates a new running session and returns its ID
    pub fn create_session(&mut self, root_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (root_url, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![root_url, now, config_hash, SessionStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Marks a session finished with the given status
    pub fn finish_session(&mut self, session_id: i64, status: SessionStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sessions SET finished_at = ?1, status = ?2 WHERE id = ?3",
            params![now, status.to_db_string(), session_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }

    /// Gets a session by ID
    pub fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        self.conn
            .query_row(
                "SELECT id, root_url, started_at, finished_at, config_hash, status
                 FROM sessions WHERE id = ?1",
                params![session_id],
                session_from_row,
            )
            .optional()?
            .ok_or(StorageError::SessionNotFound(session_id))
    }

    /// Gets the most recent session
    pub fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, root_url, started_at, finished_at, config_hash, status
                 FROM sessions ORDER BY id DESC LIMIT 1",
                [],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    // ===== Outcomes =====

    /// Records one fetch outcome for a session
    pub fn insert_outcome(&mut self, session_id: i64, outcome: &FetchOutcome) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO outcomes (session_id, root_url, url, status_code, text, failure_reason, reported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session_id,
                outcome.root_url,
                outcome.url,
                outcome.status_code,
                outcome.text(),
                outcome.failure_reason(),
                now
            ],
        )?;
        Ok(())
    }

    /// Loads every outcome recorded for a session, in insertion order
    pub fn get_outcomes(&self, session_id: i64) -> StorageResult<Vec<FetchOutcome>> {
        let mut stmt = self.conn.prepare(
            "SELECT root_url, url, status_code, text, failure_reason
             FROM outcomes WHERE session_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            let root_url: String = row.get(0)?;
            let url: String = row.get(1)?;
            let status_code: Option<u16> = row.get(2)?;
            let text: Option<String> = row.get(3)?;
            let reason: Option<String> = row.get(4)?;
            Ok(match (text, reason) {
                (Some(text), _) => FetchOutcome::with_text(root_url, url, status_code, text),
                (None, reason) => FetchOutcome::failed(
                    root_url,
                    url,
                    status_code,
                    reason.unwrap_or_default(),
                ),
            })
        })?;

        let mut outcomes = Vec::new();
        for outcome in rows {
            outcomes.push(outcome?);
        }
        Ok(outcomes)
    }

    /// Counts outcomes for a session, grouped by success and failure reason
    pub fn outcome_counts(&self, session_id: i64) -> StorageResult<OutcomeCounts> {
        let (total, with_text): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(text) FROM outcomes WHERE session_id = ?1",
            params![session_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT failure_reason, COUNT(*) AS n FROM outcomes
             WHERE session_id = ?1 AND failure_reason IS NOT NULL
             GROUP BY failure_reason ORDER BY n DESC, failure_reason",
        )?;
        let reasons = stmt.query_map(params![session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut failure_reasons = Vec::new();
        for reason in reasons {
            failure_reasons.push(reason?);
        }

        Ok(OutcomeCounts {
            total: total as u64,
            with_text: with_text as u64,
            failed: (total - with_text) as u64,
            failure_reasons,
        })
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        root_url: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: SessionStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(SessionStatus::Running),
    })
}
