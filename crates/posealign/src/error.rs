use posealign_linalg::LinalgError;
use posealign_tensor::TensorError;
use thiserror::Error;

/// Error types for the alignment routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcrustesError {
    /// An input does not have the shape implied by the other inputs.
    ///
    /// Detected before any computation starts.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Which input is malformed.
        what: &'static str,
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape.
        actual: Vec<usize>,
    },

    /// A batch element has no valid points, so its mean and norm are undefined.
    #[error("Batch element {batch_index} has no valid points")]
    InvalidMask {
        /// Index of the offending batch element.
        batch_index: usize,
    },

    /// The decomposition of a batch element failed or its input was degenerate.
    #[error("Decomposition failed for batch element {batch_index}: {reason}")]
    DecompositionFailure {
        /// Index of the offending batch element.
        batch_index: usize,
        /// Description of the failure.
        reason: String,
    },

    /// A metric was requested over an empty set of points.
    #[error("Cannot compute a point error over an empty point set")]
    EmptyPointSet,

    /// Error in a batched linear algebra routine.
    #[error("Linear algebra error: {0}")]
    Linalg(LinalgError),

    /// Error with a tensor.
    #[error("Error with the tensor: {0}")]
    Tensor(#[from] TensorError),
}

impl ProcrustesError {
    /// Returns the batch index a per-element error refers to, if any.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::InvalidMask { batch_index } | Self::DecompositionFailure { batch_index, .. } => {
                Some(*batch_index)
            }
            _ => None,
        }
    }

    /// Rewrites the batch index of a per-element error.
    pub(crate) fn with_batch_index(self, index: usize) -> Self {
        match self {
            Self::InvalidMask { .. } => Self::InvalidMask { batch_index: index },
            Self::DecompositionFailure { reason, .. } => Self::DecompositionFailure {
                batch_index: index,
                reason,
            },
            other => other,
        }
    }
}

impl From<LinalgError> for ProcrustesError {
    fn from(err: LinalgError) -> Self {
        match err {
            LinalgError::SvdFailed {
                batch_index,
                reason,
            } => Self::DecompositionFailure {
                batch_index,
                reason,
            },
            other => Self::Linalg(other),
        }
    }
}

impl From<posealign_linalg::ParallelError> for ProcrustesError {
    fn from(err: posealign_linalg::ParallelError) -> Self {
        Self::Linalg(err.into())
    }
}
