use posealign_linalg::{try_map_batches, ExecutionStrategy};
use posealign_tensor::{PointBatch, Tensor3, ValidityMask};

use crate::error::ProcrustesError;
use crate::validity::check_mask_shape;

/// Validity-aware statistics of a batch of point sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Mean of the valid points, shape `[B, 1, D]`.
    pub mean: Tensor3<f64>,
    /// Frobenius norm of the centered valid points, shape `[B, 1, 1]`.
    pub norm: Tensor3<f64>,
    /// Centered points scaled to unit norm, zero at invalid positions, shape `[B, N, D]`.
    pub normalized: Tensor3<f64>,
}

struct ElementStats {
    mean: Vec<f64>,
    norm: f64,
    normalized: Vec<f64>,
}

/// Center every point set on its valid points and scale it to unit Frobenius norm.
///
/// Invalid positions (and NaN coordinates) are zeroed before any reduction. The mean is
/// computed as the sum over all `N` zeroed points divided by `N`, then multiplied by
/// `N / valid_count` to undo the dilution by the zeroed entries.
///
/// # Arguments
///
/// * `points` - The point sets with shape `[B, N, D]`.
/// * `mask` - The validity of every point with shape `[B, N]`.
/// * `strategy` - How to distribute the batch elements.
///
/// # Errors
///
/// * `ShapeMismatch` if the mask does not have shape `[B, N]`.
/// * `InvalidMask` if a batch element has no valid points.
/// * `DecompositionFailure` if the valid points of a batch element all coincide or are not
///   finite, so that the norm is zero or undefined.
pub fn normalize(
    points: &PointBatch,
    mask: &ValidityMask,
    strategy: ExecutionStrategy,
) -> Result<Normalized, ProcrustesError> {
    check_mask_shape(points, mask)?;
    let [batch, n_points, dim] = points.shape;

    let point_batches = points.outer_iter().collect::<Vec<_>>();
    let mask_batches = mask.outer_iter().collect::<Vec<_>>();

    let elements = try_map_batches(strategy, batch, |b| {
        normalize_element(point_batches[b], mask_batches[b], dim, b)
    })?;

    let mut mean = Vec::with_capacity(batch * dim);
    let mut norm = Vec::with_capacity(batch);
    let mut normalized = Vec::with_capacity(batch * n_points * dim);
    for element in elements {
        mean.extend(element.mean);
        norm.push(element.norm);
        normalized.extend(element.normalized);
    }

    Ok(Normalized {
        mean: Tensor3::from_shape_vec([batch, 1, dim], mean)?,
        norm: Tensor3::from_shape_vec([batch, 1, 1], norm)?,
        normalized: Tensor3::from_shape_vec([batch, n_points, dim], normalized)?,
    })
}

fn normalize_element(
    points: &[f64],
    valid: &[bool],
    dim: usize,
    batch_index: usize,
) -> Result<ElementStats, ProcrustesError> {
    let n_points = valid.len();
    let valid_count = valid.iter().filter(|&&v| v).count();
    if valid_count == 0 {
        return Err(ProcrustesError::InvalidMask { batch_index });
    }
    let correction = n_points as f64 / valid_count as f64;

    let masked = |i: usize, d: usize| {
        let x = points[i * dim + d];
        if valid[i] && !x.is_nan() {
            x
        } else {
            0.0
        }
    };

    let mut mean = vec![0.0; dim];
    for i in 0..n_points {
        for (d, m) in mean.iter_mut().enumerate() {
            *m += masked(i, d);
        }
    }
    for m in mean.iter_mut() {
        *m = *m / n_points as f64 * correction;
    }

    let mut centered = vec![0.0; n_points * dim];
    for i in (0..n_points).filter(|&i| valid[i]) {
        for d in 0..dim {
            centered[i * dim + d] = masked(i, d) - mean[d];
        }
    }

    let norm = centered.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !norm.is_finite() {
        return Err(ProcrustesError::DecompositionFailure {
            batch_index,
            reason: "point set norm is not finite".to_string(),
        });
    }
    if norm == 0.0 {
        return Err(ProcrustesError::DecompositionFailure {
            batch_index,
            reason: "valid points have zero spread".to_string(),
        });
    }

    let normalized = centered.into_iter().map(|x| x / norm).collect();

    Ok(ElementStats {
        mean,
        norm,
        normalized,
    })
}
