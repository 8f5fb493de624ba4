//! Minimum-interval limiter shared by concurrent callers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Spaces calls at least `min_interval` apart, across all clones.
///
/// Each `acquire` reserves the next free slot under the lock and then sleeps
/// outside it, so concurrent callers queue up in slot order without holding
/// the lock while waiting.
#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    min_interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, min_interval: Duration) -> Self {
        Self {
            name,
            min_interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a call may start. Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let wait_time = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(start + self.min_interval);
            start - now
        };

        if wait_time > Duration::ZERO {
            debug!("{}: waiting {:?} before request", self.name, wait_time);
            tokio::time::sleep(wait_time).await;
        }
        wait_time
    }
}
