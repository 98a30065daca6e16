use posealign_tensor::{PointBatch, ValidityMask};

use crate::error::ProcrustesError;

/// Derive a validity mask from a batch of points.
///
/// A point is valid if none of its coordinates is NaN. This is how missing ground-truth joints
/// are encoded by the datasets the alignment is evaluated on.
///
/// # Example
///
/// ```
/// use posealign::validity_from_points;
/// use posealign_tensor::PointBatch;
///
/// let gt = PointBatch::from_point_sets(&[vec![[0.0, 0.0, 0.0], [f64::NAN, 1.0, 2.0]]]).unwrap();
/// let mask = validity_from_points(&gt);
/// assert_eq!(mask.as_slice(), &[true, false]);
/// ```
pub fn validity_from_points(points: &PointBatch) -> ValidityMask {
    let [batch, n_points, dim] = points.shape;
    let data = points.as_slice();
    ValidityMask::from_shape_fn([batch, n_points], |[b, i]| {
        let offset = b * points.strides[0] + i * points.strides[1];
        !data[offset..offset + dim].iter().any(|x| x.is_nan())
    })
}

/// Return a copy of `points` with every NaN coordinate replaced by zero.
pub fn nan_to_zero(points: &PointBatch) -> PointBatch {
    points.map(|&x| if x.is_nan() { 0.0 } else { x })
}

/// Count the valid points of every batch element.
pub fn valid_counts(mask: &ValidityMask) -> Vec<usize> {
    mask.outer_iter()
        .map(|row| row.iter().filter(|&&v| v).count())
        .collect()
}

/// Check that `mask` has shape `[B, N]` for points of shape `[B, N, D]`.
pub(crate) fn check_mask_shape(
    points: &PointBatch,
    mask: &ValidityMask,
) -> Result<(), ProcrustesError> {
    let expected = [points.shape[0], points.shape[1]];
    if mask.shape != expected {
        return Err(ProcrustesError::ShapeMismatch {
            what: "validity mask",
            expected: expected.to_vec(),
            actual: mask.shape.to_vec(),
        });
    }
    Ok(())
}
