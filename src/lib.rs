//! Resilient execution of independently-failing asynchronous tasks.
//!
//! Three composable pieces:
//!
//! - [`Retrier`]: re-invokes a single failing task with linearly growing,
//!   jittered cooldowns between attempts.
//! - [`Throttler`]: runs a batch of tasks through per-task retriers under a
//!   bounded concurrency limit, with fail-fast or continue-on-error policy
//!   and results aligned to input order.
//! - [`DeadlineGuard`]: races any single operation (a whole batch included)
//!   against a wall-clock timer.
//!
//! Progress reporting and backoff waits go through injected collaborators
//! ([`ProgressSink`], [`Delay`]) rather than ambient globals, so the engine
//! is deterministic under test and carries no state across calls.
//!
//! ```rust,no_run
//! use tenacity::{RetryPolicy, ThrottlePolicy, Throttler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let policy = ThrottlePolicy::default()
//!     .max_concurrency(4)
//!     .fail_fast(false)
//!     .retry(RetryPolicy::default().retry_times(2).base_cooldown_secs(0.5));
//!
//! let tasks: Vec<_> = (0..16u64)
//!     .map(|n| move || async move { Ok::<_, std::io::Error>(n * n) })
//!     .collect();
//!
//! let results = Throttler::new(policy).run(tasks).await?;
//! assert_eq!(results.len(), 16);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deadline;
pub mod delay;
pub mod error;
pub mod progress;
pub mod retry;
pub mod throttle;

pub use config::{RetryPolicy, ThrottlePolicy};
pub use deadline::{with_deadline, DeadlineGuard, DeadlineOutcome, DEFAULT_DEADLINE};
pub use delay::{Delay, TokioDelay};
pub use error::{DeadlineElapsed, EngineError};
pub use progress::{NoopSink, ProgressEvent, ProgressSink, TracingSink};
pub use retry::{cooldown_for_attempt, draw_entropy, retry_async, Retrier};
pub use throttle::{throttle_and_retry, BatchResult, Throttler};
