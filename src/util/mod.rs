use rayon::ThreadPoolBuilder;

/// Runs `op` on the global rayon pool (`threads == 0`, the platform
/// default) or inside a scoped pool with the requested number of workers.
///
/// Every batch API of the crate funnels through here, so the caller
/// controls parallelism with a single integer.
pub fn with_pool<T: Send>(threads: usize, op: impl FnOnce() -> T + Send) -> T {
    match threads {
        0 => op(),
        n => ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .expect("failed to build worker pool")
            .install(op),
    }
}
