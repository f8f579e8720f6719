//! Crawl-wide request rate limiting
//!
//! A fixed-window counter: at most `max_calls` acquisitions are admitted per
//! window of `period`. Bursts of up to twice the rate are possible across a
//! window boundary, so only the average rate over several periods is bounded.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Window {
    started: Instant,
    calls: u32,
}

/// Fixed-window rate limiter shared by all fetch workers
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    period: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_calls` per `period`
    ///
    /// A `max_calls` of zero is treated as one.
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            period,
            window: Mutex::new(Window {
                started: Instant::now(),
                calls: 0,
            }),
        }
    }

    /// Creates a limiter admitting `max_rps` calls per second
    pub fn per_second(max_rps: u32) -> Self {
        Self::new(max_rps, Duration::from_secs(1))
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits until the caller may proceed
    ///
    /// Each attempt runs under the lock; the lock is released while sleeping
    /// and the check is repeated on wake, since the window may have been reset
    /// and refilled by other callers in the meantime.
    pub async fn acquire(&self) {
        loop {
            let remaining = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                if now.duration_since(window.started) >= self.period {
                    window.started = now;
                    window.calls = 0;
                }

                window.calls += 1;
                if window.calls <= self.max_calls {
                    return;
                }

                self.period
                    .saturating_sub(now.duration_since(window.started))
            };

            tracing::trace!("Rate limit exceeded, sleeping for {:?}", remaining);
            tokio::time::sleep(remaining).await;
        }
    }
}
