//! Worker logic for the thread pool.
//!
//! A worker owns one queue and one executing thread. The thread pops from
//! its own queue first; on a miss it steals one task from its donor (the
//! next worker in the ring), and if that also misses it sleeps for the
//! configured idle backoff. There is no condition variable, so the push
//! path never pays a wake-up cost.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use super::PoolContext;
use crate::queue::BoundedQueue;
use crate::task::Task;

pub(crate) struct Worker {
    id: usize,
    queue: Arc<BoundedQueue<Task>>,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn new(id: usize, queue_size: usize) -> Self {
        Self {
            id,
            queue: Arc::new(BoundedQueue::new(queue_size)),
            running: Arc::new(AtomicBool::new(true)),
            thread: None,
        }
    }

    /// Shared handle to this worker's queue, for donor wiring.
    pub(crate) fn queue(&self) -> Arc<BoundedQueue<Task>> {
        Arc::clone(&self.queue)
    }

    /// Attempts to enqueue a task, handing it back if the queue is full.
    pub(crate) fn post(&self, task: Task) -> Result<(), Task> {
        self.queue.push(task)
    }

    /// Spawns the executing thread. Single-use.
    pub(crate) fn start(
        &mut self,
        donor: Arc<BoundedQueue<Task>>,
        ctx: Arc<PoolContext>,
    ) -> io::Result<()> {
        debug_assert!(self.thread.is_none(), "worker started twice");

        let id = self.id;
        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name(format!("shardpool-worker-{}", id))
            .spawn(move || run(id, queue, donor, running, ctx))?;
        self.thread = Some(handle);
        Ok(())
    }

    /// Flags the loop to exit after the task in flight, without waiting.
    pub(crate) fn signal_stop(&self) {
        // Relaxed: the loop only needs eventual visibility; one idle backoff
        // of extra latency is accepted.
        self.running.store(false, Ordering::Relaxed);
    }

    /// Waits for the executing thread to finish.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Executing thread main loop.
fn run(
    id: usize,
    queue: Arc<BoundedQueue<Task>>,
    donor: Arc<BoundedQueue<Task>>,
    running: Arc<AtomicBool>,
    ctx: Arc<PoolContext>,
) {
    if let Some(on_start) = &ctx.on_start {
        let _ = catch_unwind(AssertUnwindSafe(|| on_start(id)));
    }
    if let Some(metrics) = &ctx.metrics {
        metrics.on_worker_started(id);
    }

    // In a single-worker pool the donor is this worker's own queue; polling
    // it again would be an ordinary local pop, not a steal.
    let has_sibling = !Arc::ptr_eq(&queue, &donor);

    while running.load(Ordering::Relaxed) {
        let task = match queue.pop() {
            Some(task) => Some(task),
            None if has_sibling => {
                let stolen = donor.pop();
                if stolen.is_some() {
                    if let Some(metrics) = &ctx.metrics {
                        metrics.on_task_stolen(id);
                    }
                }
                stolen
            }
            None => None,
        };

        match task {
            Some(mut task) => {
                // A task's failure must never take the worker down with it.
                let _ = catch_unwind(AssertUnwindSafe(|| task.call(id)));
                if let Some(metrics) = &ctx.metrics {
                    metrics.on_task_executed(id);
                }
            }
            None => thread::sleep(ctx.idle_backoff),
        }
    }

    if let Some(metrics) = &ctx.metrics {
        metrics.on_worker_stopped(id);
    }
    if let Some(on_stop) = &ctx.on_stop {
        let _ = catch_unwind(AssertUnwindSafe(|| on_stop(id)));
    }
}
