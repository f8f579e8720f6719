use crate::output::{FetchOutcome, ResultSink, SinkResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Keeps every outcome in memory
///
/// Useful when embedding the crawler and inspecting results afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    outcomes: Mutex<Vec<FetchOutcome>>,
    initialized: AtomicBool,
    interrupted: AtomicBool,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the outcomes reported so far
    pub fn outcomes(&self) -> Vec<FetchOutcome> {
        self.outcomes
            .lock()
            .map(|outcomes| outcomes.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn init(&self) -> SinkResult<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn report(&self, outcome: &FetchOutcome) -> SinkResult<()> {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
        Ok(())
    }

    fn mark_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    async fn close(&self) -> SinkResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
