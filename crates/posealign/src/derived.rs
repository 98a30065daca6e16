//! Evaluation-oriented wrappers around [`procrustes`](crate::procrustes()).
//!
//! Ground-truth point sets mark missing points with NaN coordinates. These helpers derive the
//! validity mask from the ground truth, sanitize both inputs and run the alignment.

use posealign_tensor::{PointBatch, Tensor2, ValidityMask};

use crate::config::ProcrustesConfig;
use crate::error::ProcrustesError;
use crate::procrustes::procrustes;
use crate::validity::{nan_to_zero, validity_from_points};

/// Align predicted points onto ground truth whose missing points are NaN.
///
/// The mask is derived from `gt` (a point is valid if it has no NaN coordinate) and NaN
/// coordinates of both inputs are replaced by zero before the fit.
///
/// # Arguments
///
/// * `pred` - The predicted point sets with shape `[B, N, D]`.
/// * `gt` - The ground-truth point sets with shape `[B, N, D]`.
/// * `config` - Scaling and reflection flags and the execution strategy.
///
/// # Returns
///
/// The aligned predictions with shape `[B, N, D]` and the validity mask used for the fit.
pub fn rigid_align(
    pred: &PointBatch,
    gt: &PointBatch,
    config: &ProcrustesConfig,
) -> Result<(PointBatch, ValidityMask), ProcrustesError> {
    let mask = validity_from_points(gt);
    let aligned = procrustes(&nan_to_zero(gt), &nan_to_zero(pred), Some(&mask), config)?;
    Ok((aligned, mask))
}

/// Like [`rigid_align`] but returns the ground truth completed with aligned predictions.
///
/// Valid ground-truth points are kept as they are and invalid ones are replaced by the
/// corresponding aligned prediction.
pub fn rigid_align_filled(
    pred: &PointBatch,
    gt: &PointBatch,
    config: &ProcrustesConfig,
) -> Result<PointBatch, ProcrustesError> {
    let (aligned, mask) = rigid_align(pred, gt, config)?;

    let [_, n_points, dim] = gt.shape;
    let valid = mask.as_slice();
    let filled = PointBatch::from_shape_fn(gt.shape, |[b, i, d]| {
        let offset = (b * n_points + i) * dim + d;
        if valid[b * n_points + i] {
            gt.as_slice()[offset]
        } else {
            aligned.as_slice()[offset]
        }
    });
    Ok(filled)
}

/// Align predictions onto ground truth and keep only the valid correspondences.
///
/// # Returns
///
/// A pair `(aligned, gt)` of `[M, D]` tensors holding the aligned predictions and the ground
/// truth at the `M` valid positions, in batch-major order.
///
/// # Example
///
/// ```
/// use posealign::{rigid_align_valid_points, ProcrustesConfig};
/// use posealign_tensor::PointBatch;
///
/// let gt = PointBatch::from_point_sets(&[vec![
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [f64::NAN, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ]])
/// .unwrap();
/// let (aligned, valid_gt) =
///     rigid_align_valid_points(&gt, &gt, &ProcrustesConfig::default()).unwrap();
/// assert_eq!(aligned.shape, [4, 3]);
/// assert_eq!(valid_gt.shape, [4, 3]);
/// ```
pub fn rigid_align_valid_points(
    pred: &PointBatch,
    gt: &PointBatch,
    config: &ProcrustesConfig,
) -> Result<(Tensor2<f64>, Tensor2<f64>), ProcrustesError> {
    let (aligned, mask) = rigid_align(pred, gt, config)?;

    let dim = gt.shape[2];
    let mut aligned_valid = Vec::new();
    let mut gt_valid = Vec::new();
    for ((&valid, a), g) in mask
        .as_slice()
        .iter()
        .zip(aligned.as_slice().chunks_exact(dim))
        .zip(gt.as_slice().chunks_exact(dim))
    {
        if valid {
            aligned_valid.extend_from_slice(a);
            gt_valid.extend_from_slice(g);
        }
    }

    let count = gt_valid.len() / dim;
    Ok((
        Tensor2::from_shape_vec([count, dim], aligned_valid)?,
        Tensor2::from_shape_vec([count, dim], gt_valid)?,
    ))
}
