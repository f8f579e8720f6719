//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Tidewalk database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl sessions
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per reported fetch outcome
CREATE TABLE IF NOT EXISTS outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    root_url TEXT NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER,
    text TEXT,
    failure_reason TEXT,
    reported_at TEXT NOT NULL,
    CHECK ((text IS NULL) <> (failure_reason IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_outcomes_session ON outcomes(session_id);
CREATE INDEX IF NOT EXISTS idx_outcomes_url ON outcomes(url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
