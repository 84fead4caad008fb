//! Retry and throttle policies
//!
//! Plain records with sensible defaults plus fluent setters. Policies are
//! validated once, before any task is admitted, so a bad policy can never
//! start work.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Retry behavior for a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first. Total attempts = `retry_times + 1`;
    /// zero means a single attempt and no retries.
    pub retry_times: usize,

    /// Base cooldown between attempts, in seconds. Must be positive and
    /// finite. The cooldown before the n-th retry grows linearly:
    /// `(base_cooldown_secs + entropy) * n`.
    pub base_cooldown_secs: f64,

    /// Add random variation to each cooldown so many callers retrying the
    /// same resource do not wake in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_times: 5,
            base_cooldown_secs: 10.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn retry_times(mut self, retry_times: usize) -> Self {
        self.retry_times = retry_times;
        self
    }

    pub fn base_cooldown_secs(mut self, secs: f64) -> Self {
        self.base_cooldown_secs = secs;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Rejects cooldowns that could not be turned into a wait duration.
    pub fn validate<E>(&self) -> Result<(), EngineError<E>> {
        if !self.base_cooldown_secs.is_finite() || self.base_cooldown_secs <= 0.0 {
            return Err(EngineError::InvalidPolicy(format!(
                "base_cooldown_secs must be a positive finite number, got {}",
                self.base_cooldown_secs
            )));
        }
        Ok(())
    }
}

/// Batch execution behavior. The embedded [`RetryPolicy`] is applied
/// uniformly to every task in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    /// Upper bound on tasks concurrently in flight. Must be at least 1.
    pub max_concurrency: usize,

    /// When true, the first task to exhaust its retries stops further
    /// admissions and fails the whole batch. When false, every task runs to
    /// completion and failures are reported per slot.
    pub fail_fast: bool,

    /// Retry behavior applied to each task.
    pub retry: RetryPolicy,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            fail_fast: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl ThrottlePolicy {
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate<E>(&self) -> Result<(), EngineError<E>> {
        if self.max_concurrency == 0 {
            return Err(EngineError::InvalidPolicy(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        self.retry.validate()
    }
}
