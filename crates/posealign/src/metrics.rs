use posealign_tensor::{PointBatch, Tensor2};

use crate::config::ProcrustesConfig;
use crate::derived::rigid_align_valid_points;
use crate::error::ProcrustesError;

/// Mean Euclidean distance between corresponding points.
///
/// # Arguments
///
/// * `a` - The first point list with shape `[M, D]`.
/// * `b` - The second point list with shape `[M, D]`.
///
/// # Errors
///
/// * `ShapeMismatch` if the shapes differ.
/// * `EmptyPointSet` if `M == 0`.
///
/// # Example
///
/// ```
/// use posealign::mean_point_error;
/// use posealign_tensor::Tensor2;
///
/// let a = Tensor2::from_shape_vec([2, 2], vec![0.0, 0.0, 1.0, 1.0]).unwrap();
/// let b = Tensor2::from_shape_vec([2, 2], vec![3.0, 4.0, 1.0, 1.0]).unwrap();
/// assert_eq!(mean_point_error(&a, &b).unwrap(), 2.5);
/// ```
pub fn mean_point_error(a: &Tensor2<f64>, b: &Tensor2<f64>) -> Result<f64, ProcrustesError> {
    if a.shape != b.shape {
        return Err(ProcrustesError::ShapeMismatch {
            what: "point list",
            expected: a.shape.to_vec(),
            actual: b.shape.to_vec(),
        });
    }
    let [count, _] = a.shape;
    if count == 0 {
        return Err(ProcrustesError::EmptyPointSet);
    }

    let total = a
        .outer_iter()
        .zip(b.outer_iter())
        .map(|(p, q)| {
            p.iter()
                .zip(q)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt()
        })
        .sum::<f64>();

    Ok(total / count as f64)
}

/// Mean point error after aligning the predictions onto the ground truth (PA-MPJPE).
///
/// Only the points valid in `gt` contribute. See [`rigid_align_valid_points`].
pub fn procrustes_aligned_error(
    pred: &PointBatch,
    gt: &PointBatch,
    config: &ProcrustesConfig,
) -> Result<f64, ProcrustesError> {
    let (aligned, gt_valid) = rigid_align_valid_points(pred, gt, config)?;
    mean_point_error(&aligned, &gt_valid)
}
