//! Statistics display for stored crawl sessions
//!
//! Backs the `--stats` CLI mode, which reads the sqlite sink's database.

use crate::storage::{OutcomeCounts, SessionRecord, SqliteStorage, StorageResult};
use std::fmt::Write;

/// Loads the most recent session and its outcome counts
pub fn load_latest_counts(
    storage: &SqliteStorage,
) -> StorageResult<Option<(SessionRecord, OutcomeCounts)>> {
    match storage.get_latest_session()? {
        Some(session) => {
            let counts = storage.outcome_counts(session.id)?;
            Ok(Some((session, counts)))
        }
        None => Ok(None),
    }
}

/// Renders outcome counts for one session as a human-readable report
pub fn format_outcome_counts(session: &SessionRecord, counts: &OutcomeCounts) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Session #{}:", session.id);
    let _ = writeln!(out, "  Root URL: {}", session.root_url);
    let _ = writeln!(out, "  Started: {}", session.started_at);
    let _ = writeln!(
        out,
        "  Finished: {}",
        session.finished_at.as_deref().unwrap_or("(not finished)")
    );
    let _ = writeln!(out, "  Status: {}", session.status.to_db_string());
    let _ = writeln!(out);

    let _ = writeln!(out, "Outcomes:");
    let _ = writeln!(out, "  Total reported: {}", counts.total);
    let _ = writeln!(out, "  With text: {}", counts.with_text);
    let _ = writeln!(out, "  Failed: {}", counts.failed);
    // success_rate is already a percentage
    let _ = writeln!(out, "  Success rate: {:.1}%", counts.success_rate());

    if !counts.failure_reasons.is_empty() {
        let _ = writeln!(out, "\nFailure Reasons:");
        for (reason, count) in &counts.failure_reasons {
            let _ = writeln!(out, "  {}: {}", reason, count);
        }
    }
    out
}

/// Prints outcome counts for one session to stdout
pub fn print_outcome_counts(session: &SessionRecord, counts: &OutcomeCounts) {
    println!("{}", format_outcome_counts(session, counts));
}
