//! Output module: where fetch outcomes go
//!
//! Every fetched URL produces one [`FetchOutcome`] which the crawler hands to a
//! [`ResultSink`]. Sinks are chosen when the crawler is built:
//! - [`StdoutSink`] prints successful pages for debugging
//! - [`MemorySink`] collects outcomes in memory
//! - [`SqliteSink`] persists every outcome in a crawl session
//! - [`ElasticsearchSink`] indexes successful pages for search

mod elasticsearch;
mod memory;
mod outcome;
mod sqlite_output;
pub mod stats;
mod stdout;
mod traits;

pub use elasticsearch::ElasticsearchSink;
pub use memory::MemorySink;
pub use outcome::{FetchOutcome, OutcomeBody};
pub use sqlite_output::SqliteSink;
pub use stats::{format_outcome_counts, load_latest_counts, print_outcome_counts};
pub use stdout::StdoutSink;
pub use traits::{ResultSink, SinkError, SinkResult};

use crate::config::{OutputConfig, SinkKind};
use std::path::Path;
use std::sync::Arc;

/// Builds the sink selected by the output configuration
///
/// `root_url` and `config_hash` are recorded with SQLite sessions.
pub fn build_sink(
    output: &OutputConfig,
    root_url: &str,
    config_hash: &str,
) -> SinkResult<Arc<dyn ResultSink>> {
    let sink: Arc<dyn ResultSink> = match output.sink {
        SinkKind::Stdout => Arc::new(StdoutSink::new()),
        SinkKind::Sqlite => {
            let path = output.database_path.as_deref().ok_or_else(|| {
                SinkError::Misconfigured("sqlite sink requires database-path".to_string())
            })?;
            Arc::new(SqliteSink::open(Path::new(path), root_url, config_hash)?)
        }
        SinkKind::Elasticsearch => Arc::new(ElasticsearchSink::new(&output.elasticsearch)?),
    };
    Ok(sink)
}
