pub trait MetricsCollector: Send + Sync {
    fn on_worker_started(&self, worker_id: usize);
    fn on_worker_stopped(&self, worker_id: usize);
    fn on_task_executed(&self, worker_id: usize);
    fn on_task_stolen(&self, worker_id: usize);
    fn on_task_rejected(&self);
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct PoolMetrics {
    pub executed_tasks: AtomicUsize,
    pub stolen_tasks: AtomicUsize,
    pub rejected_tasks: AtomicUsize,
    pub active_threads: AtomicUsize,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self {
            executed_tasks: AtomicUsize::new(0),
            stolen_tasks: AtomicUsize::new(0),
            rejected_tasks: AtomicUsize::new(0),
            active_threads: AtomicUsize::new(0),
        }
    }
}

impl Default for PoolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// a default collector that uses atomic counters
pub struct AtomicMetricsCollector {
    pub metrics: Arc<PoolMetrics>,
}

impl AtomicMetricsCollector {
    pub fn new(metrics: Arc<PoolMetrics>) -> Self {
        Self { metrics }
    }
}

impl MetricsCollector for AtomicMetricsCollector {
    fn on_worker_started(&self, _worker_id: usize) {
        self.metrics.active_threads.fetch_add(1, Ordering::Relaxed);
    }
    fn on_worker_stopped(&self, _worker_id: usize) {
        self.metrics.active_threads.fetch_sub(1, Ordering::Relaxed);
    }
    fn on_task_executed(&self, _worker_id: usize) {
        self.metrics.executed_tasks.fetch_add(1, Ordering::Relaxed);
    }
    fn on_task_stolen(&self, _worker_id: usize) {
        self.metrics.stolen_tasks.fetch_add(1, Ordering::Relaxed);
    }
    fn on_task_rejected(&self) {
        self.metrics.rejected_tasks.fetch_add(1, Ordering::Relaxed);
    }
}
