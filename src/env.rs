//! Clock abstraction for the poll loop.
//!
//! The client never calls `tokio::time::sleep` directly. Poll-retry backoff
//! and inter-iteration pacing both go through a [`Clock`], so tests can drive
//! an unbounded retry loop without waiting on wall-clock time.
//!
//! Implementations:
//!
//! - [`TokioClock`]: real timer, used by the binary.
//! - Test clocks record requested durations and return immediately.

use std::future::Future;
use std::time::Duration;

/// Source of delays for the client.
pub trait Clock: Send + Sync {
    /// Sleeps for the specified duration.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
