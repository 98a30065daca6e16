use posealign_linalg::{
    batched_column, batched_determinant, batched_matmul, batched_select, batched_svd, map_batches,
    ExecutionStrategy, Transpose,
};
use posealign_tensor::{PointBatch, Tensor1, Tensor3, ValidityMask};

use crate::config::ProcrustesConfig;
use crate::error::ProcrustesError;
use crate::normalize::normalize;
use crate::validity::check_mask_shape;

/// Least-squares similarity transforms mapping source point sets onto target point sets.
///
/// Element `b` maps a source point `y` (a row vector) to
/// `((y - mean_source[b]) · rotation[b]) * scale[b] + mean_target[b]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcrustesTransform {
    /// Mean of the valid source points, shape `[B, 1, D]`.
    pub mean_source: Tensor3<f64>,
    /// Orthogonal alignment matrices applied to row vectors, shape `[B, D, D]`.
    pub rotation: Tensor3<f64>,
    /// Uniform scale factors, shape `[B]`. All ones when scaling is not fitted.
    pub scale: Tensor1<f64>,
    /// Mean of the valid target points, shape `[B, 1, D]`.
    pub mean_target: Tensor3<f64>,
}

impl ProcrustesTransform {
    /// Number of batch elements.
    pub fn batch_size(&self) -> usize {
        self.rotation.shape[0]
    }

    /// Dimensionality of the points.
    pub fn dim(&self) -> usize {
        self.rotation.shape[2]
    }

    /// The row-major `[D, D]` alignment matrix of batch element `index`.
    pub fn rotation_at(&self, index: usize) -> Option<&[f64]> {
        self.rotation.outer(index)
    }

    /// The scale factor of batch element `index`.
    pub fn scale_at(&self, index: usize) -> Option<f64> {
        self.scale.get([index]).copied()
    }

    /// The translation `t` such that a source row vector `y` maps to `y · (scale * rotation) + t`.
    ///
    /// Returns a tensor with shape `[B, 1, D]`.
    pub fn translation(&self) -> Tensor3<f64> {
        let dim = self.dim();
        let rot = self.rotation.as_slice();
        let mean_source = self.mean_source.as_slice();
        Tensor3::from_shape_fn([self.batch_size(), 1, dim], |[b, _, j]| {
            let rotated = (0..dim)
                .map(|k| mean_source[b * dim + k] * rot[b * dim * dim + k * dim + j])
                .sum::<f64>();
            self.mean_target.as_slice()[b * dim + j] - self.scale.as_slice()[b] * rotated
        })
    }

    /// Apply the transforms to a batch of source points.
    ///
    /// NaN coordinates in `source` are treated as zero.
    ///
    /// # Arguments
    ///
    /// * `source` - Points with shape `[B, N, D]` for any `N`.
    /// * `strategy` - How to distribute the batch elements.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the batch size or dimensionality differ from the transform.
    pub fn apply(
        &self,
        source: &PointBatch,
        strategy: ExecutionStrategy,
    ) -> Result<PointBatch, ProcrustesError> {
        let [batch, n_points, dim] = source.shape;
        if batch != self.batch_size() || dim != self.dim() {
            return Err(ProcrustesError::ShapeMismatch {
                what: "points to transform",
                expected: vec![self.batch_size(), n_points, self.dim()],
                actual: source.shape.to_vec(),
            });
        }

        let mean_source = self.mean_source.as_slice();
        let centered = Tensor3::from_shape_fn(source.shape, |[b, i, d]| {
            let y = source.as_slice()[b * source.strides[0] + i * dim + d];
            let y = if y.is_nan() { 0.0 } else { y };
            y - mean_source[b * dim + d]
        });

        let rotated = batched_matmul(&centered, &self.rotation, Transpose::None, strategy)?;

        let scale = self.scale.as_slice();
        let mean_target = self.mean_target.as_slice();
        let aligned = Tensor3::from_shape_fn(source.shape, |[b, i, d]| {
            rotated.as_slice()[b * rotated.strides[0] + i * dim + d] * scale[b]
                + mean_target[b * dim + d]
        });
        Ok(aligned)
    }
}

/// Compute the transforms that best superimpose `source` onto `target`.
///
/// For every batch element independently, finds the translation, orthogonal matrix and
/// (optionally) uniform scale minimizing the squared distance between the transformed valid
/// source points and the valid target points.
///
/// # Arguments
///
/// * `target` - The reference point sets X (e.g. ground truth) with shape `[B, N, D]`.
/// * `source` - The point sets Y to register (e.g. predictions) with shape `[B, N, D]`.
/// * `mask` - Which points take part in the fit, shape `[B, N]`. `None` means all points.
/// * `config` - Scaling and reflection flags and the execution strategy.
///
/// # Errors
///
/// * `ShapeMismatch` before any computation if the inputs disagree in shape or `D == 0`.
/// * `InvalidMask` if a batch element has no valid points.
/// * `DecompositionFailure` if a batch element is degenerate or its SVD fails.
///
/// The whole call fails if any element fails. Within a stage the lowest failing batch index is
/// reported; use [`procrustes_per_element`] to keep the results of healthy elements.
///
/// # Example
///
/// ```
/// use posealign::{procrustes_transform, ProcrustesConfig};
/// use posealign_tensor::PointBatch;
///
/// let target = PointBatch::from_point_sets(&[vec![
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [0.0, 0.0, 1.0],
/// ]])
/// .unwrap();
/// let source = target.map(|x| x + 5.0);
///
/// let config = ProcrustesConfig::default();
/// let transform = procrustes_transform(&target, &source, None, &config).unwrap();
/// let t = transform.translation();
/// assert!(t.as_slice().iter().all(|x| (x + 5.0).abs() < 1e-9));
/// ```
pub fn procrustes_transform(
    target: &PointBatch,
    source: &PointBatch,
    mask: Option<&ValidityMask>,
    config: &ProcrustesConfig,
) -> Result<ProcrustesTransform, ProcrustesError> {
    check_inputs(target, source, mask)?;

    let [batch, n_points, dim] = target.shape;
    let strategy = config.strategy;

    let all_valid;
    let mask = match mask {
        Some(mask) => mask,
        None => {
            all_valid = ValidityMask::from_shape_val([batch, n_points], true);
            &all_valid
        }
    };

    let x = normalize(target, mask, strategy)?;
    let y = normalize(source, mask, strategy)?;

    // cross-covariance of the normalized sets, contracted over the points axis
    let cov = batched_matmul(&y.normalized, &x.normalized, Transpose::Lhs, strategy)?;
    let svd = batched_svd(&cov, strategy)?;
    let mut rotation = batched_matmul(&svd.u, &svd.v, Transpose::Rhs, strategy)?;

    let singular_values = svd.s.as_slice();
    let relative_scale = config.allow_scaling.then(|| {
        x.norm
            .as_slice()
            .iter()
            .zip(y.norm.as_slice())
            .map(|(nx, ny)| nx / ny)
            .collect::<Vec<_>>()
    });
    let mut scale = match &relative_scale {
        Some(relative_scale) => Tensor1::from_shape_vec(
            [batch],
            relative_scale
                .iter()
                .zip(svd.s.outer_iter())
                .map(|(r, s)| r * s.iter().sum::<f64>())
                .collect(),
        )?,
        None => Tensor1::from_shape_val([batch], 1.0),
    };

    if !config.allow_reflection {
        // flip across the direction of least variance, i.e. the last singular vector pair
        let det = batched_determinant(&rotation, strategy)?;
        let has_reflection = det.as_slice().iter().map(|&d| d < 0.0).collect::<Vec<_>>();

        let u_last = batched_column(&svd.u, dim - 1)?;
        let v_last = batched_column(&svd.v, dim - 1)?;
        let flip = batched_matmul(&u_last, &v_last, Transpose::Rhs, strategy)?;
        let mirrored = Tensor3::from_shape_vec(
            rotation.shape,
            rotation
                .as_slice()
                .iter()
                .zip(flip.as_slice())
                .map(|(t, f)| t - 2.0 * f)
                .collect(),
        )?;
        rotation = batched_select(&has_reflection, &mirrored, &rotation)?;

        if let Some(relative_scale) = &relative_scale {
            let scale_mirror = Tensor1::from_shape_fn([batch], |[b]| {
                scale.as_slice()[b] - 2.0 * relative_scale[b] * singular_values[b * dim + dim - 1]
            });
            scale = batched_select(&has_reflection, &scale_mirror, &scale)?;
        }

        log::debug!(
            "removed reflection from {} of {} batch elements",
            has_reflection.iter().filter(|&&r| r).count(),
            batch
        );
    }

    Ok(ProcrustesTransform {
        mean_source: y.mean,
        rotation,
        scale,
        mean_target: x.mean,
    })
}

/// Register `source` onto `target` and return the aligned source points.
///
/// See [`procrustes_transform`] for the arguments and errors. The output has the shape of
/// `source`; all points are transformed, including the ones excluded from the fit.
pub fn procrustes(
    target: &PointBatch,
    source: &PointBatch,
    mask: Option<&ValidityMask>,
    config: &ProcrustesConfig,
) -> Result<PointBatch, ProcrustesError> {
    let transform = procrustes_transform(target, source, mask, config)?;
    transform.apply(source, config.strategy)
}

/// Like [`procrustes_transform`], but isolates failures per batch element.
///
/// Shape errors still fail the whole call. Otherwise every batch element is fitted on its
/// own and the returned vector holds, in batch order, either a single-element transform or
/// the error of that element (with its index in the original batch). Results of healthy
/// elements are returned even when others fail.
pub fn procrustes_per_element(
    target: &PointBatch,
    source: &PointBatch,
    mask: Option<&ValidityMask>,
    config: &ProcrustesConfig,
) -> Result<Vec<Result<ProcrustesTransform, ProcrustesError>>, ProcrustesError> {
    check_inputs(target, source, mask)?;

    let [batch, n_points, dim] = target.shape;
    let element_config = config.with_strategy(ExecutionStrategy::Serial);

    let results = map_batches(config.strategy, batch, |b| {
        let element = |points: &PointBatch| -> Result<PointBatch, ProcrustesError> {
            let data = points.outer(b).unwrap_or_default();
            Ok(PointBatch::from_shape_slice([1, n_points, dim], data)?)
        };
        let target_b = element(target)?;
        let source_b = element(source)?;
        let mask_b = match mask {
            Some(mask) => Some(ValidityMask::from_shape_slice(
                [1, n_points],
                mask.outer(b).unwrap_or_default(),
            )?),
            None => None,
        };

        procrustes_transform(&target_b, &source_b, mask_b.as_ref(), &element_config)
            .map_err(|err| err.with_batch_index(b))
            .inspect_err(|err| log::debug!("batch element {b} failed: {err}"))
    })?;

    Ok(results)
}

fn check_inputs(
    target: &PointBatch,
    source: &PointBatch,
    mask: Option<&ValidityMask>,
) -> Result<(), ProcrustesError> {
    if source.shape != target.shape {
        return Err(ProcrustesError::ShapeMismatch {
            what: "source points",
            expected: target.shape.to_vec(),
            actual: source.shape.to_vec(),
        });
    }
    if target.shape[2] == 0 {
        return Err(ProcrustesError::ShapeMismatch {
            what: "point dimensionality",
            expected: vec![target.shape[0], target.shape[1], 1],
            actual: target.shape.to_vec(),
        });
    }
    if let Some(mask) = mask {
        check_mask_shape(target, mask)?;
    }
    Ok(())
}
