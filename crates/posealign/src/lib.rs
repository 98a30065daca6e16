#![deny(missing_docs)]
//! Batched Procrustes alignment of 3D point sets.
//!
//! Given a batch of target point sets `X` (e.g. ground-truth joints) and source point sets `Y`
//! (e.g. predicted joints) with shape `[B, N, D]`, plus a per-point validity mask `[B, N]`,
//! the crate finds for every batch element the translation, orthogonal matrix and optional
//! uniform scale that best superimpose the valid points of `Y` onto those of `X`.
//!
//! # Quick Start
//!
//! ```
//! use posealign::{procrustes, ProcrustesConfig};
//! use posealign_tensor::PointBatch;
//!
//! let gt = PointBatch::from_point_sets(&[vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.0],
//! ]])
//! .unwrap();
//! let pred = gt.map(|x| 2.0 * x + 1.0);
//!
//! let config = ProcrustesConfig::default().with_scaling(true);
//! let aligned = procrustes(&gt, &pred, None, &config).unwrap();
//! for (a, g) in aligned.as_slice().iter().zip(gt.as_slice()) {
//!     assert!((a - g).abs() < 1e-9);
//! }
//! ```

/// Alignment parameters.
pub mod config;

/// Wrappers deriving the validity mask from NaN ground truth.
pub mod derived;

/// Error types for the alignment routines.
pub mod error;

/// Point error metrics.
pub mod metrics;

/// Masked centering and scaling of point sets.
pub mod normalize;

/// Rotation solver, reflection and scale correction and transform application.
pub mod procrustes;

/// Validity mask helpers.
pub mod validity;

pub use crate::config::ProcrustesConfig;
pub use crate::derived::{rigid_align, rigid_align_filled, rigid_align_valid_points};
pub use crate::error::ProcrustesError;
pub use crate::metrics::{mean_point_error, procrustes_aligned_error};
pub use crate::normalize::{normalize, Normalized};
pub use crate::procrustes::{
    procrustes, procrustes_per_element, procrustes_transform, ProcrustesTransform,
};
pub use crate::validity::{nan_to_zero, valid_counts, validity_from_points};

pub use posealign_linalg::ExecutionStrategy;
pub use posealign_linalg as linalg;
pub use posealign_tensor as tensor;
