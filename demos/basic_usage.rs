fn main() {
    let pool = shardpool::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to start pool");

    pool.post(|| println!("Hello from the worker pool!"))
        .expect("queue full");

    for _ in 0..4 {
        pool.post_with_id(|id| println!("running on worker {}", id))
            .expect("queue full");
    }

    let handle = pool.process(|| (1..=4).product::<u32>());
    let res = handle.join().unwrap();
    println!("Result from task: {}", res);

    pool.shutdown();
}
