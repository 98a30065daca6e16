use posealign_tensor::TensorError;
use thiserror::Error;

use crate::parallel::ParallelError;

/// An error type for batched linear algebra operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    /// The operands of a batched operation have incompatible shapes.
    #[error("Shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        /// Name of the operation.
        op: &'static str,
        /// Shape of the left-hand operand.
        left: Vec<usize>,
        /// Shape of the right-hand operand.
        right: Vec<usize>,
    },

    /// Singular value decomposition failed for one element of the batch.
    #[error("SVD computation failed for batch element {batch_index}: {reason}")]
    SvdFailed {
        /// Index of the failing batch element.
        batch_index: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Parallel execution error.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// Tensor error.
    #[error("Error with the tensor: {0}")]
    Tensor(#[from] TensorError),
}
