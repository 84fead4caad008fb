//! Retry-on-failure with linear, jittered backoff
//!
//! A [`Retrier`] re-invokes a failing task with a cooldown that grows
//! linearly in the attempt number. Jitter shifts the cooldown's base by a
//! random amount per wait; it never compounds, so backoff stays predictable
//! while still breaking up synchronized retry storms.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;

use crate::config::RetryPolicy;
use crate::delay::{Delay, TokioDelay};
use crate::progress::{self, NoopSink, ProgressSink};

/// Wraps task invocations with retry-on-failure and backoff-with-jitter.
///
/// On exhausted retries the task's own error is returned untouched; the
/// retrier never wraps or replaces it.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    sink: Arc<dyn ProgressSink>,
    delay: Arc<dyn Delay>,
}

impl Retrier {
    /// Creates a retrier with a no-op sink and the tokio timer.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sink: Arc::new(NoopSink),
            delay: Arc::new(TokioDelay),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invokes `task` until it succeeds or `retry_times` additional attempts
    /// are exhausted. The factory is called once per attempt; it is never
    /// invoked again after a success or a definitive failure.
    ///
    /// A factory whose future is already failed at its first poll takes the
    /// same path as one that fails after suspending — both are simply the
    /// awaited attempt resolving to `Err`.
    pub async fn run<F, Fut, T, E>(&self, mut task: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts_made: usize = 0;
        loop {
            let error = match task().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            attempts_made += 1;

            if attempts_made >= self.policy.retry_times + 1 {
                progress::emit(
                    &*self.sink,
                    "Retry failed definitively",
                    json!({
                        "attempts": attempts_made,
                        "retry_times": self.policy.retry_times,
                    }),
                );
                return Err(error);
            }

            // attempts_made doubles as the 1-indexed number of the retry
            // about to run.
            let cooldown =
                cooldown_for_attempt(&self.policy, attempts_made, draw_entropy(self.policy.jitter));
            progress::emit(
                &*self.sink,
                "Retry failed, pausing...",
                json!({
                    "attempt": attempts_made,
                    "retry_times": self.policy.retry_times,
                    "base_cooldown_secs": self.policy.base_cooldown_secs,
                    "cooldown_ms": cooldown.as_secs_f64() * 1000.0,
                }),
            );
            self.delay.sleep(cooldown).await;
            progress::emit(
                &*self.sink,
                "Cooldown complete, continuing...",
                json!({ "attempt": attempts_made }),
            );
        }
    }
}

/// Cooldown before the 1-indexed retry `attempt`:
/// `(base_cooldown_secs + entropy) * attempt` seconds. Growth is linear in
/// the attempt number; entropy shifts the base without compounding.
///
/// `base_cooldown_secs + entropy` must be positive and finite (enforced by
/// [`RetryPolicy::validate`] before a batch runs).
pub fn cooldown_for_attempt(policy: &RetryPolicy, attempt: usize, entropy: f64) -> Duration {
    Duration::from_secs_f64((policy.base_cooldown_secs + entropy) * attempt as f64)
}

/// Entropy for one cooldown: zero without jitter, otherwise uniform in
/// `[0.1, 1.1)`.
pub fn draw_entropy(jitter: bool) -> f64 {
    if jitter {
        rand::thread_rng().gen_range(0.1..1.1)
    } else {
        0.0
    }
}

/// Retries `task` under `policy` with the default sink and delay.
pub async fn retry_async<F, Fut, T, E>(task: F, policy: RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retrier::new(policy).run(task).await
}
