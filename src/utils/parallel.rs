//! Parallel processing utilities
use crate::{Result, ZctaError};

/// Dedicated bounded pool for I/O-bound per-state work
pub fn worker_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(workers))
        .thread_name(|i| format!("zcta-worker-{}", i))
        .build()
        .map_err(|e| ZctaError::Config(format!("Failed to build worker pool: {}", e)))
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}
