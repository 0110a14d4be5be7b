//! Error types for the thread pool.
//!
//! Submission can fail only because the selected worker's queue is full or
//! because a worker thread could not be spawned. Everything that goes wrong
//! *inside* a task is contained by the worker and surfaced, if at all,
//! through the [`TaskHandle`](crate::TaskHandle) returned by `process`.

use std::any::Any;
use std::fmt;
use std::io;

/// Errors returned by the submission and construction paths.
#[derive(Debug)]
pub enum PoolError {
    /// The selected worker's queue was full; the task was not admitted.
    ///
    /// Routing picks exactly one worker and does not retry siblings, so a
    /// full queue is reported immediately. Callers recover by backing off,
    /// dropping the work, or submitting again.
    QueueFull,
    /// The OS failed to spawn a worker thread during pool construction.
    ThreadStart(io::Error),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::QueueFull => write!(f, "worker queue is full"),
            PoolError::ThreadStart(e) => write!(f, "failed to spawn worker thread: {}", e),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::QueueFull => None,
            PoolError::ThreadStart(e) => Some(e),
        }
    }
}

/// Terminal states of a packaged task, observed through its handle.
pub enum TaskError {
    /// The task was rejected at submission because the selected worker's
    /// queue was full. It was never queued and never ran.
    QueueFull,
    /// The task was dropped before it could run, typically because the pool
    /// was torn down while it was still queued.
    BrokenPromise,
    /// The task panicked. The payload is whatever was passed to `panic!`.
    Panicked(Box<dyn Any + Send + 'static>),
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::QueueFull => f.write_str("QueueFull"),
            TaskError::BrokenPromise => f.write_str("BrokenPromise"),
            TaskError::Panicked(_) => f.write_str("Panicked(..)"),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::QueueFull => write!(f, "task rejected: worker queue is full"),
            TaskError::BrokenPromise => write!(f, "task dropped before it was executed"),
            TaskError::Panicked(_) => write!(f, "task panicked"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Returned when invoking a task container that holds no callable.
///
/// Only reachable by driving [`FixedFnOnce`](crate::task::FixedFnOnce)
/// directly; the pool never enqueues an empty task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyCall;

impl fmt::Display for EmptyCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call of empty task container")
    }
}

impl std::error::Error for EmptyCall {}
