pub mod handle;
mod worker;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use crate::errors::{PoolError, TaskError};
use crate::metrics::MetricsCollector;
use crate::task::Task;
use handle::{package_task, TaskHandle};
use worker::Worker;

type LifecycleHook = Arc<dyn Fn(usize) + Send + Sync + 'static>;

/// Configuration shared by every worker thread.
pub(crate) struct PoolContext {
    pub(crate) on_start: Option<LifecycleHook>,
    pub(crate) on_stop: Option<LifecycleHook>,
    pub(crate) metrics: Option<Arc<dyn MetricsCollector>>,
    pub(crate) idle_backoff: Duration,
}

/// A fixed-size work-stealing thread pool with bounded per-worker queues.
///
/// Submissions are routed round-robin to exactly one worker and either
/// admitted or rejected immediately; producers never block and never wait on
/// a lock. Each worker drains its own queue first and steals from the next
/// worker in the ring when idle.
///
/// Dropping the pool stops every worker and joins its thread. Tasks still
/// queued at that point are dropped without being executed.
pub struct ThreadPool {
    workers: Vec<Worker>,
    next_worker: AtomicUsize,
    ctx: Arc<PoolContext>,
}

impl ThreadPool {
    /// Builder with default options.
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::new()
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Posts a fire-and-forget task.
    ///
    /// Fails with [`PoolError::QueueFull`] iff the selected worker's queue
    /// is full; no other worker is tried. The task's panic, if any, is
    /// contained by the worker and lost; use [`process`](ThreadPool::process)
    /// to observe outcomes.
    pub fn post<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_with_id(move |_worker_id| f())
    }

    /// Posts a fire-and-forget task that receives the executing worker's id.
    pub fn post_with_id<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce(usize) + Send + 'static,
    {
        self.route(Task::new(f)).map_err(|rejected| {
            drop(rejected);
            if let Some(metrics) = &self.ctx.metrics {
                metrics.on_task_rejected();
            }
            PoolError::QueueFull
        })
    }

    /// Submits a task and returns a handle to its result.
    ///
    /// The worker delivers the callable's return value, or the payload of
    /// its panic, through the handle. Admission failure and teardown before
    /// execution are also surfaced there, as
    /// [`TaskError::QueueFull`] and [`TaskError::BrokenPromise`]; this
    /// method itself never fails.
    pub fn process<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.process_with_id(move |_worker_id| f())
    }

    /// Like [`process`](ThreadPool::process), passing the executing worker's
    /// id to the callable.
    pub fn process_with_id<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce(usize) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, handle, reject) = package_task(f);
        if let Err(rejected) = self.route(task) {
            // The rejected task holds the primary sender; drop it first so
            // the channel sees the explicit rejection, not a bare close.
            drop(rejected);
            if let Some(metrics) = &self.ctx.metrics {
                metrics.on_task_rejected();
            }
            let _ = reject.send(Err(TaskError::QueueFull));
        }
        handle
    }

    /// Stops the pool and joins all workers. Equivalent to dropping it.
    pub fn shutdown(self) {}

    /// Routes a task to the next worker in round-robin order.
    fn route(&self, task: Task) -> Result<(), Task> {
        let id = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[id].post(task)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Flag every worker before joining any, so the slowest sleeper
        // bounds the whole teardown instead of each one in turn.
        for worker in &self.workers {
            worker.signal_stop();
        }
        for worker in &mut self.workers {
            worker.join();
        }
    }
}

/// Builder for [`ThreadPool`].
pub struct ThreadPoolBuilder {
    num_threads: Option<usize>,
    queue_size: usize,
    idle_backoff: Duration,
    on_start: Option<LifecycleHook>,
    on_stop: Option<LifecycleHook>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl ThreadPoolBuilder {
    pub fn new() -> Self {
        Self {
            num_threads: None,
            queue_size: 1024,
            idle_backoff: Duration::from_millis(1),
            on_start: None,
            on_stop: None,
            metrics: None,
        }
    }

    /// Number of workers. When not set, one per available hardware thread.
    /// An explicit request is clamped to at least one worker.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Per-worker queue capacity, rounded up to a power of two.
    pub fn queue_size(mut self, capacity: usize) -> Self {
        self.queue_size = capacity;
        self
    }

    /// How long an idle worker sleeps when both its own queue and its
    /// donor's are empty. Default 1 ms.
    pub fn idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    /// Hook run once on each worker thread before its first pop.
    /// Panics inside the hook are contained.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Hook run once on each worker thread after its loop exits.
    /// Panics inside the hook are contained.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// Optional metrics sink; no per-task cost when absent.
    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(collector);
        self
    }

    /// Creates the workers, wires each one's steal donor to the next worker
    /// in the ring, and starts every thread before returning.
    ///
    /// An OS-level spawn failure stops the workers already started and is
    /// returned as [`PoolError::ThreadStart`].
    pub fn build(self) -> Result<ThreadPool, PoolError> {
        let num_threads = match self.num_threads {
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            Some(n) => n.max(1),
        };

        let ctx = Arc::new(PoolContext {
            on_start: self.on_start,
            on_stop: self.on_stop,
            metrics: self.metrics,
            idle_backoff: self.idle_backoff,
        });

        let mut workers: Vec<Worker> = (0..num_threads)
            .map(|id| Worker::new(id, self.queue_size))
            .collect();
        let queues: Vec<_> = workers.iter().map(|w| w.queue()).collect();

        for i in 0..num_threads {
            let donor = Arc::clone(&queues[(i + 1) % num_threads]);
            if let Err(e) = workers[i].start(donor, Arc::clone(&ctx)) {
                for started in &workers[..i] {
                    started.signal_stop();
                }
                for started in &mut workers[..i] {
                    started.join();
                }
                return Err(PoolError::ThreadStart(e));
            }
        }

        Ok(ThreadPool {
            workers,
            next_worker: AtomicUsize::new(0),
            ctx,
        })
    }
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
