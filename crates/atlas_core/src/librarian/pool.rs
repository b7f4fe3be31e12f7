use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Fixed-size pool that converts keyed raw records in parallel.
///
/// Every item travels with its identifier, so results never rely on
/// positional alignment with the input.
pub struct WorkerPool {
    workers: usize,
    pool: Option<ThreadPool>,
}

impl WorkerPool {
    /// Builds a pool; one worker (or zero) runs inline on the caller's thread.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = if workers > 1 {
            Some(ThreadPoolBuilder::new().num_threads(workers).build()?)
        } else {
            None
        };
        Ok(Self {
            workers: workers.max(1),
            pool,
        })
    }

    /// Inline pool that never spawns threads.
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            pool: None,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Applies `convert` to each `(identifier, raw)` pair.
    pub fn map_keyed<R, T, F>(&self, items: Vec<(String, R)>, convert: F) -> Vec<(String, T)>
    where
        R: Send,
        T: Send,
        F: Fn(&str, R) -> T + Send + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| {
                items
                    .into_par_iter()
                    .map(|(identifier, raw)| {
                        let converted = convert(&identifier, raw);
                        (identifier, converted)
                    })
                    .collect()
            }),
            None => items
                .into_iter()
                .map(|(identifier, raw)| {
                    let converted = convert(&identifier, raw);
                    (identifier, converted)
                })
                .collect(),
        }
    }
}
