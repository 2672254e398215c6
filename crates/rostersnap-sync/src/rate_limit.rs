//! Request gate for the remote bucket
//!
//! Spaces outbound requests by a minimum interval so the storage backend
//! never sees bursts, no matter how many callers schedule work at once.
//!
//! ## Architecture
//!
//! - [`RequestGate`]: a single serialized execution chain. Each scheduled
//!   operation waits for the previous one to finish (or fail), then sleeps
//!   off whatever remains of the interval measured from the previous
//!   operation's *start*.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use rostersnap_sync::rate_limit::RequestGate;
//!
//! # async fn example() {
//! let gate = RequestGate::new(Duration::from_millis(200));
//! let first = gate.schedule(|| async { 1 }).await;
//! let second = gate.schedule(|| async { 2 }).await; // starts >= 200ms after the first
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Default spacing between consecutive requests
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// RequestGate
// ============================================================================

/// Serializes operations and enforces a minimum spacing between their starts
///
/// One gate is meant to be shared (behind an `Arc`) by everything that talks
/// to the same remote. Independent gates do not coordinate, which keeps
/// tests isolated.
#[derive(Debug)]
pub struct RequestGate {
    /// Minimum time between the starts of two operations
    min_interval: Duration,
    /// Start time of the most recent operation. Held for the whole
    /// operation so that scheduled work runs strictly one at a time.
    last_start: Mutex<Option<Instant>>,
}

impl RequestGate {
    /// Creates a gate with the given minimum interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Returns the configured minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Runs `operation` once every previously scheduled operation has
    /// finished and the minimum interval has elapsed
    ///
    /// The operation's output, including any error, is returned unchanged.
    /// A failing operation releases the gate like a successful one.
    pub async fn schedule<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                trace!(
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Request gate waiting"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_start = Some(Instant::now());
        operation().await
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
