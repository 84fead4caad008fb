//! Error types for the execution engine

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the engine itself, generic over the caller's task
/// error type `E` so a failing task's own error reaches the caller
/// unmodified — the engine never stringifies or re-wraps it.
#[derive(Debug, Error)]
pub enum EngineError<E> {
    /// A policy was rejected before any task was started.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// A task exhausted its retries under fail-fast. `error` carries the
    /// task's original failure untouched.
    #[error("task {index} failed after {attempts} attempts")]
    TaskFailed {
        index: usize,
        attempts: usize,
        error: E,
    },

    /// A deadline guard's timer fired before the operation settled.
    #[error("operation exceeded its {0:?} deadline")]
    DeadlineElapsed(Duration),
}

/// Timeout error returned by [`crate::DeadlineGuard`]. A distinct type so a
/// timeout can never be confused with a failure produced by the guarded
/// operation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation exceeded its {0:?} deadline")]
pub struct DeadlineElapsed(pub Duration);

impl<E> From<DeadlineElapsed> for EngineError<E> {
    fn from(elapsed: DeadlineElapsed) -> Self {
        EngineError::DeadlineElapsed(elapsed.0)
    }
}
