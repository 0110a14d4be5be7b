//! shardpool
//
// `shardpool` is a fixed-size worker pool for short, non-blocking tasks,
// built to keep submission and dispatch latency low under contention. The
// single logical queue is sharded into one bounded lock-free queue per
// worker; idle workers steal from the next worker in the ring.
//

//? ## Features
//? - Nearly wait-free task submission from any number of producer threads.
//? - Per-worker bounded MPMC queues with single-donor work stealing.
//? - Heap-free task storage: callables live inline in each queue slot.
//? - Result handles that carry values and panics back to the submitter.
//? - Lifecycle hooks and optional metrics collection.

//! # Example
//! ```rust
//! use shardpool::ThreadPoolBuilder;
//!
//! let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
//!
//! pool.post(|| println!("fire and forget")).unwrap();
//!
//! let handle = pool.process(|| 6 * 7);
//! assert_eq!(handle.join().unwrap(), 42);
//!
//! pool.shutdown();
//! ```

mod errors;
mod macros;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod task;

pub use errors::{EmptyCall, PoolError, TaskError};
pub use pool::handle::TaskHandle;
pub use pool::{ThreadPool, ThreadPoolBuilder};
pub use task::Task;

// only available on debug, testing or benchmarking modes
#[cfg(any(debug_assertions, test, feature = "bench"))]
pub fn run_unpooled(tasks: Vec<Box<dyn FnOnce() + Send>>) {
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| std::thread::spawn(task))
        .collect();

    for h in handles {
        let _ = h.join();
    }
}
