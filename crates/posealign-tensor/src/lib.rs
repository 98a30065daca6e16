#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `posealign-tensor` provides the owned, row-major arrays that flow through the alignment
//! pipeline. The tensor rank is a const generic so a batch of point sets (`[B, N, D]`) and its
//! validity mask (`[B, N]`) cannot be confused at compile time.
//!
//! # Quick Start
//!
//! ```rust
//! use posealign_tensor::{PointBatch, ValidityMask};
//!
//! // two examples with two 3d points each
//! let points = PointBatch::from_point_sets(&[
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
//!     vec![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
//! ])
//! .unwrap();
//! assert_eq!(points.shape, [2, 2, 3]);
//!
//! let mask = ValidityMask::from_shape_val([2, 2], true);
//! assert_eq!(mask.outer(1), Some(&[true, true][..]));
//! ```

/// Serialization support for tensors.
#[cfg(feature = "serde")]
pub mod serde;

/// Tensor implementation.
pub mod tensor;

pub use crate::tensor::{Tensor, TensorError};

/// Type alias for a 1-dimensional tensor.
pub type Tensor1<T> = Tensor<T, 1>;

/// Type alias for a 2-dimensional tensor.
pub type Tensor2<T> = Tensor<T, 2>;

/// Type alias for a 3-dimensional tensor.
pub type Tensor3<T> = Tensor<T, 3>;

/// A batch of point sets with shape `[batch, n_points, dim]`.
///
/// Entries at invalid positions may hold NaN or any placeholder value.
pub type PointBatch = Tensor3<f64>;

/// Per-point validity flags with shape `[batch, n_points]`, shared across the `dim` axis.
pub type ValidityMask = Tensor2<bool>;
