//! Pending work for the fetch workers
//!
//! The queue decouples link discovery from fetching and tracks unfinished
//! items so the crawler can tell when the frontier is exhausted.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Semaphore};

/// A URL waiting to be fetched, with its hop count from the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub depth: u32,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Producer/consumer store with completion tracking
///
/// Every item returned by `get` must be acknowledged exactly once with `ack`;
/// `join` resolves once every item ever put has been acknowledged. Delivery
/// order is not part of the contract.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Adds an item; never blocks
    fn put(&self, item: WorkItem);

    /// Waits for an item to become available
    async fn get(&self) -> WorkItem;

    /// Marks one previously returned item as done
    fn ack(&self);

    /// Waits until all put items have been acknowledged
    async fn join(&self);

    /// Number of items waiting to be handed out
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all pending items and completion state
    ///
    /// Only valid when no worker holds an unacknowledged item.
    fn purge(&self);
}

/// In-process FIFO queue
pub struct MemoryQueue {
    items: Mutex<VecDeque<WorkItem>>,
    available: Semaphore,
    unfinished: watch::Sender<usize>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
            unfinished,
        }
    }

    /// Items put but not yet acknowledged, including ones being processed
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    // A panic elsewhere must not lose items that `unfinished` already counts
    fn items(&self) -> MutexGuard<'_, VecDeque<WorkItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop(&self) -> Option<WorkItem> {
        self.items().pop_front()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    fn put(&self, item: WorkItem) {
        self.unfinished.send_modify(|n| *n += 1);
        self.items().push_back(item);
        self.available.add_permits(1);
    }

    async fn get(&self) -> WorkItem {
        loop {
            match self.available.acquire().await {
                Ok(permit) => permit.forget(),
                // The semaphore is never closed
                Err(_) => std::future::pending::<()>().await,
            }
            // A permit can outlive its item after a purge
            if let Some(item) = self.pop() {
                return item;
            }
        }
    }

    fn ack(&self) {
        self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
    }

    async fn join(&self) {
        let mut unfinished = self.unfinished.subscribe();
        let _ = unfinished.wait_for(|n| *n == 0).await;
    }

    fn len(&self) -> usize {
        self.items().len()
    }

    fn purge(&self) {
        self.items().clear();
        self.unfinished.send_replace(0);
    }
}

/// An item taken from a queue, acknowledged when dropped
///
/// Dropping happens on every exit path: normal return, early return, panic
/// unwind, and cancellation of the owning task.
pub struct ClaimedItem<'q> {
    queue: &'q dyn WorkQueue,
    item: WorkItem,
}

impl Deref for ClaimedItem<'_> {
    type Target = WorkItem;

    fn deref(&self) -> &WorkItem {
        &self.item
    }
}

impl Drop for ClaimedItem<'_> {
    fn drop(&mut self) {
        self.queue.ack();
    }
}

/// Takes the next item from `queue`, wrapped so it is always acknowledged
pub async fn claim(queue: &dyn WorkQueue) -> ClaimedItem<'_> {
    let item = queue.get().await;
    ClaimedItem { queue, item }
}
