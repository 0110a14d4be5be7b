//! Result handles for tasks submitted through `process`.
//!
//! A packaged task carries the sending half of a single-use channel and
//! settles it exactly once: with the callable's value, or with the panic
//! payload the worker caught. If the task is destroyed without running (the
//! pool was torn down, or admission failed), the channel closes unsatisfied
//! and the handle reports that instead of hanging.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::errors::TaskError;
use crate::task::Task;

pub(crate) type Settle<T> = Sender<Result<T, TaskError>>;

/// A handle to a task's result.
///
/// Obtained from [`ThreadPool::process`](crate::ThreadPool::process); the
/// result can be read exactly once via [`join`](TaskHandle::join).
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task settles and returns its outcome.
    ///
    /// A closed, never-satisfied channel means the task was dropped before
    /// it could run; that is reported as [`TaskError::BrokenPromise`].
    pub fn join(self) -> Result<T, TaskError> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::BrokenPromise),
        }
    }
}

/// Packages `f` into a void [`Task`] that settles a result channel.
///
/// Returns the task, the caller's handle, and a spare sender. The pool uses
/// the spare to settle the handle with [`TaskError::QueueFull`] when
/// admission fails, since by that point the task itself (and the sender
/// inside it) has already been consumed and dropped.
pub(crate) fn package_task<F, R>(f: F) -> (Task, TaskHandle<R>, Settle<R>)
where
    F: FnOnce(usize) -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = channel();
    let reject = tx.clone();
    let task = Task::new(move |worker_id| {
        let outcome = catch_unwind(AssertUnwindSafe(|| f(worker_id))).map_err(TaskError::Panicked);
        let _ = tx.send(outcome);
    });
    (task, TaskHandle { receiver: rx }, reject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_with_value() {
        let (mut task, handle, _reject) = package_task(|id| id + 40);
        task.call(2).unwrap();
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn settles_with_panic_payload() {
        let (mut task, handle, _reject) = package_task::<_, ()>(|_| panic!("boom"));
        let _ = catch_unwind(AssertUnwindSafe(|| task.call(0)));
        match handle.join() {
            Err(TaskError::Panicked(payload)) => {
                assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
            }
            other => panic!("expected panic outcome, got {:?}", other),
        }
    }

    #[test]
    fn dropped_task_breaks_the_promise() {
        let (task, handle, reject) = package_task(|_| 1);
        drop(reject);
        drop(task);
        assert!(matches!(handle.join(), Err(TaskError::BrokenPromise)));
    }

    #[test]
    fn reject_sender_reports_queue_full() {
        let (task, handle, reject) = package_task(|_| 1);
        drop(task);
        let _ = reject.send(Err(TaskError::QueueFull));
        assert!(matches!(handle.join(), Err(TaskError::QueueFull)));
    }
}
