//! Deadline guard: race an operation against a wall-clock timer
//!
//! The guarded operation is spawned onto the runtime and raced against a
//! timer. Whichever settles first decides the outcome. Losing the race does
//! not cancel the operation — the task model offers no cancellation hook, so
//! the spawned task is detached and runs to completion in the background.
//! Releasing whatever resources an abandoned operation holds is the caller's
//! responsibility.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::timeout;

use crate::error::DeadlineElapsed;

/// Default deadline when none is configured.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Outcome of a deadline race when a timeout is reported as a value rather
/// than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineOutcome<T> {
    /// The operation settled first; its output, success or failure.
    Completed(T),
    /// The timer fired first. The operation keeps running detached; its
    /// eventual output is discarded.
    TimedOut,
}

/// Bounds the wall-clock time of a single pending operation.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    timeout: Duration,
}

impl Default for DeadlineGuard {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DEADLINE,
        }
    }
}

impl DeadlineGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Races `op` against the guard's timer. If the operation settles first
    /// its output — success or failure — propagates unchanged; if the timer
    /// fires first the guard fails with [`DeadlineElapsed`].
    ///
    /// On timeout the operation is abandoned, not cancelled: it keeps
    /// running detached and the caller is responsible for any cleanup it
    /// leaves behind.
    pub async fn enforce<Fut>(&self, op: Fut) -> Result<Fut::Output, DeadlineElapsed>
    where
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let handle = tokio::spawn(op);
        match timeout(self.timeout, handle).await {
            Ok(joined) => Ok(resume_panics(joined)),
            // Dropping the join handle detaches the task.
            Err(_) => Err(DeadlineElapsed(self.timeout)),
        }
    }

    /// Like [`enforce`](Self::enforce), but a timeout resolves successfully
    /// with the [`DeadlineOutcome::TimedOut`] sentinel instead of an error.
    /// The abandonment semantics are identical.
    pub async fn observe<Fut>(&self, op: Fut) -> DeadlineOutcome<Fut::Output>
    where
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let handle = tokio::spawn(op);
        match timeout(self.timeout, handle).await {
            Ok(joined) => DeadlineOutcome::Completed(resume_panics(joined)),
            Err(_) => DeadlineOutcome::TimedOut,
        }
    }
}

/// Races `op` against `timeout`; shorthand for [`DeadlineGuard::enforce`].
pub async fn with_deadline<Fut>(op: Fut, timeout: Duration) -> Result<Fut::Output, DeadlineElapsed>
where
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    DeadlineGuard::new(timeout).enforce(op).await
}

fn resume_panics<T>(joined: Result<T, JoinError>) -> T {
    match joined {
        Ok(output) => output,
        Err(join_error) => match join_error.try_into_panic() {
            Ok(payload) => std::panic::resume_unwind(payload),
            // The guard never aborts the handle it is awaiting.
            Err(join_error) => panic!("guarded operation was cancelled: {join_error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_timer_wins_with_enforce() {
        let guard = DeadlineGuard::new(Duration::from_millis(10));
        let err = guard
            .enforce(async {
                sleep(Duration::from_millis(50)).await;
                Ok::<i32, String>(7)
            })
            .await
            .unwrap_err();

        assert_eq!(err, DeadlineElapsed(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_timer_wins_with_observe() {
        let guard = DeadlineGuard::new(Duration::from_millis(10));
        let outcome = guard
            .observe(async {
                sleep(Duration::from_millis(50)).await;
                Ok::<i32, String>(7)
            })
            .await;

        assert_eq!(outcome, DeadlineOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_operation_wins() {
        let guard = DeadlineGuard::new(Duration::from_millis(100));
        let result = guard
            .enforce(async {
                sleep(Duration::from_millis(5)).await;
                Ok::<i32, String>(7)
            })
            .await
            .unwrap();

        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_operation_failure_passes_through() {
        let guard = DeadlineGuard::new(Duration::from_millis(100));
        let result = guard
            .enforce(async { Err::<i32, String>("boom".to_string()) })
            .await
            .unwrap();

        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_losing_operation_is_abandoned_not_cancelled() {
        let finished = Arc::new(AtomicBool::new(false));
        let finished_cl = finished.clone();

        let guard = DeadlineGuard::new(Duration::from_millis(5));
        let outcome = guard
            .observe(async move {
                sleep(Duration::from_millis(30)).await;
                finished_cl.store(true, Ordering::SeqCst);
            })
            .await;
        assert_eq!(outcome, DeadlineOutcome::TimedOut);

        // The abandoned task keeps running after the guard returned.
        sleep(Duration::from_millis(60)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_with_deadline_shorthand() {
        let result = with_deadline(async { 21 * 2 }, Duration::from_secs(1)).await;
        assert_eq!(result, Ok(42));
    }
}
