//! Fork/join worker pool for the apply engine.

use rayon::{ThreadPool, ThreadPoolBuilder};

/// Worker thread pool plus the recursion depth up to which apply forks.
pub struct Workers {
    pool: ThreadPool,
    split_depth: u32,
}

impl Workers {
    /// Build a pool with `threads` workers; `0` means one per core.
    pub fn new(threads: usize) -> Self {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("robdd worker {i}"))
            .build()
            .expect("could not build thread pool");
        let n = pool.current_num_threads() as u32;
        // Two pending forks per extra worker keeps everyone fed without
        // drowning in task overhead; one worker never forks.
        let split_depth = if n > 1 { 2 * (n - 1) } else { 0 };
        Self { pool, split_depth }
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Levels of recursion that may still fork.
    pub fn split_depth(&self) -> u32 {
        self.split_depth
    }

    /// Run `op` inside the pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// Run both closures, possibly in parallel, and wait for both.
    pub fn join<RA: Send, RB: Send>(
        &self,
        op_a: impl FnOnce() -> RA + Send,
        op_b: impl FnOnce() -> RB + Send,
    ) -> (RA, RB) {
        self.pool.join(op_a, op_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_thread_never_splits() {
        let workers = Workers::new(1);
        assert_eq!(workers.num_threads(), 1);
        assert_eq!(workers.split_depth(), 0);
    }

    #[test]
    fn test_split_depth_scales_with_workers() {
        let workers = Workers::new(4);
        assert_eq!(workers.split_depth(), 6);
    }

    #[test]
    fn test_join_runs_both() {
        let workers = Workers::new(2);
        let (a, b) = workers.join(|| 1 + 1, || 2 + 2);
        assert_eq!((a, b), (2, 4));
    }
}
