//! Bounded-concurrency batch execution with per-task retries
//!
//! A [`Throttler`] wraps every task in the batch's [`crate::RetryPolicy`] and
//! runs them on a fixed-size worker pool: `min(max_concurrency, tasks.len())`
//! workers pull indices off a shared ordered queue and write outcomes into a
//! pre-sized slot vector, so admission follows input order while completion
//! order stays free. The worker count is the only backpressure mechanism —
//! extra tasks wait in the queue, they are never rejected.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::ThrottlePolicy;
use crate::delay::{Delay, TokioDelay};
use crate::error::EngineError;
use crate::progress::{self, NoopSink, ProgressSink};
use crate::retry::Retrier;

/// Per-slot outcomes of a batch, aligned 1:1 with the input task order:
/// entry `i` always belongs to input task `i`, whatever order tasks finished
/// in.
pub type BatchResult<T, E> = Vec<Result<T, E>>;

/// Runs batches of independently-failing tasks under a concurrency bound.
pub struct Throttler {
    policy: ThrottlePolicy,
    sink: Arc<dyn ProgressSink>,
    delay: Arc<dyn Delay>,
}

impl Throttler {
    /// Creates a throttler with a no-op sink and the tokio timer.
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            sink: Arc::new(NoopSink),
            delay: Arc::new(TokioDelay),
        }
    }

    /// Injects the sink that receives the consolidated event stream: batch
    /// lifecycle, admissions, completions, and every retrier's events.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Runs `tasks` with at most `max_concurrency` concurrently in flight,
    /// each wrapped in the batch's retry policy.
    ///
    /// Under `fail_fast`, the first task to exhaust its retries stops
    /// further admissions; slots already in flight are awaited before the
    /// call returns with [`EngineError::TaskFailed`] naming the failed task
    /// and carrying its original error. Otherwise every task runs and the
    /// returned [`BatchResult`] mixes per-slot successes and failures.
    ///
    /// The policy is validated first; a bad policy fails before any task is
    /// invoked. An empty batch resolves immediately.
    pub async fn run<F, Fut, T, E>(&self, tasks: Vec<F>) -> Result<BatchResult<T, E>, EngineError<E>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.policy.validate()?;

        let total = tasks.len();
        progress::emit(
            &*self.sink,
            "Batch starting",
            json!({
                "tasks": total,
                "max_concurrency": self.policy.max_concurrency,
                "fail_fast": self.policy.fail_fast,
            }),
        );

        if total == 0 {
            progress::emit(&*self.sink, "Batch complete", json!({ "tasks": 0, "failed": 0 }));
            return Ok(Vec::new());
        }

        let retrier = Retrier::new(self.policy.retry.clone())
            .with_sink(self.sink.clone())
            .with_delay(self.delay.clone());

        let pending: Arc<Mutex<VecDeque<(usize, F)>>> =
            Arc::new(Mutex::new(tasks.into_iter().enumerate().collect()));
        let slots: Arc<Mutex<Vec<Option<Result<T, E>>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));
        // First exhausted failure under fail-fast; decides the batch error.
        let first_failure: Arc<Mutex<Option<(usize, E)>>> = Arc::new(Mutex::new(None));
        let aborted = Arc::new(AtomicBool::new(false));

        let fail_fast = self.policy.fail_fast;
        let workers = self.policy.max_concurrency.min(total);
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let pending = pending.clone();
            let slots = slots.clone();
            let first_failure = first_failure.clone();
            let aborted = aborted.clone();
            let retrier = retrier.clone();
            let sink = self.sink.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    if aborted.load(Ordering::SeqCst) {
                        break;
                    }
                    let next = pending.lock().await.pop_front();
                    let Some((index, task)) = next else { break };

                    progress::emit(
                        &*sink,
                        "Task admitted",
                        json!({ "task": index, "worker": worker }),
                    );
                    let outcome = retrier.run(task).await;
                    progress::emit(
                        &*sink,
                        "Task settled",
                        json!({ "task": index, "ok": outcome.is_ok() }),
                    );

                    match outcome {
                        Ok(value) => {
                            slots.lock().await[index] = Some(Ok(value));
                        }
                        Err(error) => {
                            if fail_fast {
                                aborted.store(true, Ordering::SeqCst);
                                let mut first = first_failure.lock().await;
                                if first.is_none() {
                                    *first = Some((index, error));
                                    continue;
                                }
                            }
                            slots.lock().await[index] = Some(Err(error));
                        }
                    }
                }
            }));
        }

        // Await every in-flight slot, failed batches included, so nothing
        // this call started outlives it.
        for joined in join_all(handles).await {
            if let Err(join_error) = joined {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
            }
        }

        if let Some((index, error)) = first_failure.lock().await.take() {
            let attempts = self.policy.retry.retry_times + 1;
            progress::emit(
                &*self.sink,
                "Batch failed",
                json!({ "failed_task": index, "attempts": attempts }),
            );
            return Err(EngineError::TaskFailed {
                index,
                attempts,
                error,
            });
        }

        let mut results = Vec::with_capacity(total);
        let mut failed = 0usize;
        for slot in slots.lock().await.drain(..) {
            // Every slot was admitted: fail-fast returned above, and in
            // continue mode nothing stops the queue from draining.
            let outcome = slot.expect("admitted task left no outcome");
            if outcome.is_err() {
                failed += 1;
            }
            results.push(outcome);
        }
        progress::emit(
            &*self.sink,
            "Batch complete",
            json!({ "tasks": total, "failed": failed }),
        );
        Ok(results)
    }
}

/// Runs `tasks` under `policy` with the default sink and delay.
pub async fn throttle_and_retry<F, Fut, T, E>(
    tasks: Vec<F>,
    policy: ThrottlePolicy,
) -> Result<BatchResult<T, E>, EngineError<E>>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Throttler::new(policy).run(tasks).await
}
