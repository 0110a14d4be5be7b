use shardpool::{
    log_metrics,
    metrics::{AtomicMetricsCollector, PoolMetrics},
    ThreadPoolBuilder,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

fn main() {
    // Create metrics and collector
    let metrics = Arc::new(PoolMetrics::new());
    let collector = Arc::new(AtomicMetricsCollector::new(metrics.clone()));

    // Create a thread pool with the metrics collector
    let pool = ThreadPoolBuilder::new()
        .num_threads(4)
        .with_metrics_collector(collector)
        .build()
        .expect("failed to start pool");

    // Create a flag to stop monitoring
    let running = Arc::new(AtomicBool::new(true));

    // Spawn a monitoring thread to display live updates
    let metrics_clone = metrics.clone();
    let running_clone = running.clone();
    let monitor_handle = thread::spawn(move || {
        while running_clone.load(Ordering::Acquire) {
            println!("\n--- Metrics ---");
            log_metrics!(metrics_clone);
            thread::sleep(Duration::from_millis(80));
        }
    });

    // Keep the workers busy long enough for a few updates
    for _ in 0..10 {
        pool.post(move || {
            thread::sleep(Duration::from_millis(100)); // Simulate work
        })
        .expect("queue full");
    }

    thread::sleep(Duration::from_millis(1000)); // Wait for tasks to finish

    // Wait for the thread pool to complete tasks
    pool.shutdown();

    // Stop the monitoring thread
    running.store(false, Ordering::Release);
    monitor_handle.join().unwrap();

    // Final metrics after shutdown
    println!("\n--- Final Metrics ---");
    log_metrics!(metrics);
}
