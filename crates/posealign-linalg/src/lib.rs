#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Batched matrix products, determinants and per-element selection.
pub mod batched;

/// Error types for the linear algebra module.
pub mod error;

/// Execution strategies to distribute batch elements over threads.
pub mod parallel;

/// Batched singular value decomposition.
pub mod svd;

/// Conversions between row-major slices and faer matrices.
pub mod utils;

pub use batched::{batched_column, batched_determinant, batched_matmul, batched_select, Transpose};
pub use error::LinalgError;
pub use parallel::{map_batches, try_map_batches, ExecutionStrategy, ParallelError};
pub use svd::{batched_svd, BatchedSvd};
