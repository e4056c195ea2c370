//! Rayon thread pool sizing for simulation batches.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::config::EngineConfig;

/// Thread pool simulation batches run on, built once and shared by clones.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    /// `None` uses the global Rayon pool (one thread per core).
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// A pool of `workers` threads; 0, or a pool that fails to start, falls back to the global pool.
    pub fn with_workers(workers: usize) -> Self {
        if workers == 0 {
            return Self::default();
        }
        match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => {
                debug!(workers, "built simulation thread pool");
                Self {
                    pool: Some(Arc::new(pool)),
                }
            }
            Err(err) => {
                warn!(workers, error = %err, "falling back to the global thread pool");
                Self::default()
            }
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_workers(config.workers)
    }

    /// Dedicated thread count, or 0 on the global pool.
    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(0, |pool| pool.current_num_threads())
    }

    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_pool_runs_on_requested_thread_count() {
        let threads = WorkerPool::with_workers(2).install(rayon::current_num_threads);
        assert_eq!(threads, 2);
    }

    #[test]
    fn pool_size_follows_config() {
        let config = EngineConfig {
            workers: 3,
            ..EngineConfig::default()
        };
        assert_eq!(WorkerPool::from_config(&config).workers(), 3);
        assert_eq!(WorkerPool::default().workers(), 0);
    }

    #[test]
    fn clones_share_one_pool() {
        let pool = WorkerPool::with_workers(2);
        let clone = pool.clone();
        let (Some(first), Some(second)) = (&pool.pool, &clone.pool) else {
            panic!("fixed-size pool should be built");
        };
        assert!(Arc::ptr_eq(first, second));
        assert_eq!(clone.install(rayon::current_num_threads), 2);
    }
}
