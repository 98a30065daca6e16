use posealign_tensor::{Tensor2, Tensor3};

use crate::error::LinalgError;
use crate::parallel::{try_map_batches, ExecutionStrategy};
use crate::utils::slice_to_faer_mat;

/// Singular value decompositions of a stack of square matrices.
///
/// For every batch element `a = u · diag(s) · vᵀ`, with the singular values in `s` sorted in
/// descending order. The last column of `u` and `v` therefore belongs to the smallest
/// singular value.
#[derive(Debug, Clone)]
pub struct BatchedSvd {
    /// Singular values with shape `[B, D]`.
    pub s: Tensor2<f64>,
    /// Left singular vectors (as columns) with shape `[B, D, D]`.
    pub u: Tensor3<f64>,
    /// Right singular vectors (as columns) with shape `[B, D, D]`.
    pub v: Tensor3<f64>,
}

struct ElementSvd {
    s: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
}

/// Compute the singular value decomposition of every matrix in a stack.
///
/// # Arguments
///
/// * `a` - A stack of square matrices with shape `[B, D, D]`.
/// * `strategy` - How to distribute the batch elements.
///
/// # Returns
///
/// The factors of every batch element, singular values sorted in descending order. Ties keep
/// the order produced by the decomposition.
///
/// # Errors
///
/// Returns `SvdFailed` for the lowest batch index whose matrix or factors are not finite.
///
/// # Example
///
/// ```
/// use posealign_linalg::{batched_svd, ExecutionStrategy};
/// use posealign_tensor::Tensor3;
///
/// let a = Tensor3::from_shape_vec([1, 2, 2], vec![1.0, 0.0, 0.0, 3.0]).unwrap();
/// let svd = batched_svd(&a, ExecutionStrategy::Serial).unwrap();
/// assert!((svd.s.as_slice()[0] - 3.0).abs() < 1e-12);
/// assert!((svd.s.as_slice()[1] - 1.0).abs() < 1e-12);
/// ```
pub fn batched_svd(
    a: &Tensor3<f64>,
    strategy: ExecutionStrategy,
) -> Result<BatchedSvd, LinalgError> {
    let [batch, rows, cols] = a.shape;
    if rows != cols {
        return Err(LinalgError::ShapeMismatch {
            op: "batched_svd",
            left: vec![rows],
            right: vec![cols],
        });
    }
    let dim = rows;

    log::trace!("batched svd over {batch} matrices of size {dim}x{dim}");

    let a_batches = a.outer_iter().collect::<Vec<_>>();
    let elements = try_map_batches(strategy, batch, |i| svd_element(a_batches[i], dim, i))?;

    let mut s = Vec::with_capacity(batch * dim);
    let mut u = Vec::with_capacity(batch * dim * dim);
    let mut v = Vec::with_capacity(batch * dim * dim);
    for element in elements {
        s.extend(element.s);
        u.extend(element.u);
        v.extend(element.v);
    }

    Ok(BatchedSvd {
        s: Tensor2::from_shape_vec([batch, dim], s)?,
        u: Tensor3::from_shape_vec([batch, dim, dim], u)?,
        v: Tensor3::from_shape_vec([batch, dim, dim], v)?,
    })
}

fn svd_element(data: &[f64], dim: usize, batch_index: usize) -> Result<ElementSvd, LinalgError> {
    if data.iter().any(|x| !x.is_finite()) {
        return Err(LinalgError::SvdFailed {
            batch_index,
            reason: "input matrix contains non-finite values".to_string(),
        });
    }

    let svd = slice_to_faer_mat(data, dim, dim).svd();
    let (u, s, v) = (svd.u(), svd.s_diagonal(), svd.v());

    // descending order; sort_by is stable so tied values keep the decomposition's order
    let mut order = (0..dim).collect::<Vec<_>>();
    order.sort_by(|&i, &j| s.read(j).total_cmp(&s.read(i)));

    let mut out = ElementSvd {
        s: order.iter().map(|&k| s.read(k)).collect(),
        u: vec![0.0; dim * dim],
        v: vec![0.0; dim * dim],
    };
    for r in 0..dim {
        for (c, &k) in order.iter().enumerate() {
            out.u[r * dim + c] = u.read(r, k);
            out.v[r * dim + c] = v.read(r, k);
        }
    }

    let finite = out
        .s
        .iter()
        .chain(out.u.iter())
        .chain(out.v.iter())
        .all(|x| x.is_finite());
    if !finite {
        return Err(LinalgError::SvdFailed {
            batch_index,
            reason: "decomposition produced non-finite factors".to_string(),
        });
    }

    Ok(out)
}
