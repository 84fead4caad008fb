//! Injectable delay primitive
//!
//! Backoff waits go through this seam instead of an ambient timer so tests
//! can substitute an instant (or recording) implementation and assert on the
//! exact durations the retrier asked for.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Suspends the caller for a duration.
pub trait Delay: Send + Sync {
    fn sleep(&self, dur: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Default delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

impl Delay for TokioDelay {
    fn sleep(&self, dur: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(dur))
    }
}
