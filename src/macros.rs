//! # Macros for `shardpool`
//!
//! Convenience macros that reduce boilerplate when configuring pools,
//! posting tasks, and printing metrics.

/// Simplifies posting tasks to the thread pool.
///
/// The plain form wraps [`ThreadPool::post`](crate::ThreadPool::post); the
/// `with_id` form passes the executing worker's id to the task.
///
/// # Examples
/// ```rust
/// use shardpool::{post_task, ThreadPoolBuilder};
///
/// let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
///
/// post_task!(pool, || println!("plain task")).unwrap();
/// post_task!(pool, |id| println!("running on worker {}", id), with_id).unwrap();
///
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! post_task {
    ($pool:expr, $task:expr) => {
        $pool.post($task)
    };
    ($pool:expr, $task:expr, with_id) => {
        $pool.post_with_id($task)
    };
}

/// Prints the current metrics of the thread pool.
///
/// # Example
/// ```rust
/// use shardpool::{log_metrics, metrics::{AtomicMetricsCollector, PoolMetrics}, ThreadPoolBuilder};
/// use std::sync::Arc;
///
/// let metrics = Arc::new(PoolMetrics::new());
/// let collector = Arc::new(AtomicMetricsCollector::new(metrics.clone()));
/// let pool = ThreadPoolBuilder::new()
///     .num_threads(2)
///     .with_metrics_collector(collector)
///     .build()
///     .unwrap();
///
/// log_metrics!(metrics);
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! log_metrics {
    ($metrics:expr) => {
        println!(
            "Executed tasks: {}",
            $metrics
                .executed_tasks
                .load(std::sync::atomic::Ordering::Relaxed)
        );
        println!(
            "Stolen tasks: {}",
            $metrics
                .stolen_tasks
                .load(std::sync::atomic::Ordering::Relaxed)
        );
        println!(
            "Rejected tasks: {}",
            $metrics
                .rejected_tasks
                .load(std::sync::atomic::Ordering::Relaxed)
        );
        println!(
            "Active threads: {}",
            $metrics
                .active_threads
                .load(std::sync::atomic::Ordering::Relaxed)
        );
    };
}

/// Creates a thread pool with the most common configurations.
///
/// # Examples
/// ```rust
/// use shardpool::create_thread_pool;
///
/// let pool = create_thread_pool!(threads: 4, queue: 256);
/// pool.shutdown();
/// ```
#[macro_export]
macro_rules! create_thread_pool {
    (threads: $num:expr) => {
        $crate::ThreadPoolBuilder::new()
            .num_threads($num)
            .build()
            .unwrap()
    };
    (threads: $num:expr, queue: $cap:expr) => {
        $crate::ThreadPoolBuilder::new()
            .num_threads($num)
            .queue_size($cap)
            .build()
            .unwrap()
    };
}
