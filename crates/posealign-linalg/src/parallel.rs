use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how the elements of a batch are processed.
///
/// Every strategy evaluates the same per-element computation and returns results in batch
/// order, so the output does not depend on the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool to process batch elements in parallel.
    #[default]
    ParallelElements,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small batches or when the overhead of parallelization outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

/// Evaluate `op` for every batch index in `0..len` and collect the results in index order.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `len` - The number of batch elements.
/// * `op` - The per-element operation.
///
/// # Example
///
/// ```
/// use posealign_linalg::parallel::{map_batches, ExecutionStrategy};
///
/// let squares = map_batches(ExecutionStrategy::Serial, 4, |i| i * i).unwrap();
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// ```
pub fn map_batches<R, F>(
    strategy: ExecutionStrategy,
    len: usize,
    op: F,
) -> Result<Vec<R>, ParallelError>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    let out = match strategy {
        ExecutionStrategy::Serial => (0..len).map(op).collect(),
        ExecutionStrategy::ParallelElements => (0..len).into_par_iter().map(op).collect(),
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(|| (0..len).into_par_iter().map(op).collect())
        }
    };
    Ok(out)
}

/// Like [`map_batches`], but for fallible operations.
///
/// All elements are evaluated; the error of the lowest failing batch index is returned so
/// the reported failure does not depend on the strategy.
pub fn try_map_batches<R, E, F>(
    strategy: ExecutionStrategy,
    len: usize,
    op: F,
) -> Result<Vec<R>, E>
where
    R: Send,
    E: Send + From<ParallelError>,
    F: Fn(usize) -> Result<R, E> + Sync + Send,
{
    map_batches(strategy, len, op)?.into_iter().collect()
}
