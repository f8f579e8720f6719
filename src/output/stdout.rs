use crate::output::{FetchOutcome, ResultSink, SinkResult};
use async_trait::async_trait;

/// Prints successful pages to stdout, for debugging crawls by eye
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResultSink for StdoutSink {
    async fn report(&self, outcome: &FetchOutcome) -> SinkResult<()> {
        if outcome.is_indexable() {
            if let Some(text) = outcome.text() {
                println!("Url {} text: {:?}", outcome.url, text);
            }
        } else {
            tracing::debug!(
                "Not printing {}: {}",
                outcome.url,
                outcome.failure_reason().unwrap_or("empty text")
            );
        }
        Ok(())
    }
}
