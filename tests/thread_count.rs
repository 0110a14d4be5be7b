#![cfg(target_os = "linux")]

use shardpool::ThreadPoolBuilder;

fn count_threads() -> usize {
    use procfs::process::Process;

    let process = Process::myself().expect("Failed to get process info");
    process.tasks().expect("Failed to get task list").count()
}

#[test]
fn test_threadpool_threads_lifecycle() {
    let initial_thread_count = count_threads();

    let num_threads = 4;
    let threadpool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .unwrap();

    // Wait for a short duration to allow threads to start
    std::thread::sleep(std::time::Duration::from_millis(100));
    let thread_count_after_start = count_threads();

    assert!(
        thread_count_after_start >= initial_thread_count + num_threads,
        "Expected at least {} threads to be started, found {}",
        num_threads,
        thread_count_after_start - initial_thread_count
    );

    threadpool.shutdown();

    // Wait for a short duration to allow threads to exit
    std::thread::sleep(std::time::Duration::from_millis(100));
    let final_thread_count = count_threads();

    assert_eq!(
        final_thread_count, initial_thread_count,
        "Expected all threads to terminate after shutdown"
    );
}
