use posealign_tensor::{Tensor, Tensor1, Tensor3};

use crate::error::LinalgError;
use crate::parallel::{try_map_batches, ExecutionStrategy};
use crate::utils::{faer_mat_to_vec, slice_to_faer_mat};

/// Which operands of [`batched_matmul`] are transposed before multiplying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    /// Compute `a · b`.
    #[default]
    None,
    /// Compute `aᵀ · b`.
    Lhs,
    /// Compute `a · bᵀ`.
    Rhs,
    /// Compute `aᵀ · bᵀ`.
    Both,
}

impl Transpose {
    fn lhs(self) -> bool {
        matches!(self, Transpose::Lhs | Transpose::Both)
    }

    fn rhs(self) -> bool {
        matches!(self, Transpose::Rhs | Transpose::Both)
    }
}

/// Multiply two stacks of matrices element by element along the batch axis.
///
/// # Arguments
///
/// * `a` - The left-hand stack with shape `[B, R1, C1]`.
/// * `b` - The right-hand stack with shape `[B, R2, C2]`.
/// * `transpose` - Which operands to transpose before multiplying.
/// * `strategy` - How to distribute the batch elements.
///
/// # Returns
///
/// The stack of products with shape `[B, M, N]`.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the batch sizes differ or the inner dimensions do not agree.
///
/// # Example
///
/// ```
/// use posealign_linalg::{batched_matmul, ExecutionStrategy, Transpose};
/// use posealign_tensor::Tensor3;
///
/// // [1, 2, 1] points -> 1x1 gram matrix
/// let a = Tensor3::from_shape_vec([1, 2, 1], vec![3.0, 4.0]).unwrap();
/// let gram = batched_matmul(&a, &a, Transpose::Lhs, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(gram.as_slice(), &[25.0]);
/// ```
pub fn batched_matmul(
    a: &Tensor3<f64>,
    b: &Tensor3<f64>,
    transpose: Transpose,
    strategy: ExecutionStrategy,
) -> Result<Tensor3<f64>, LinalgError> {
    let [batch, a_rows, a_cols] = a.shape;
    let [b_batch, b_rows, b_cols] = b.shape;

    let (m, k) = if transpose.lhs() {
        (a_cols, a_rows)
    } else {
        (a_rows, a_cols)
    };
    let (k_rhs, n) = if transpose.rhs() {
        (b_cols, b_rows)
    } else {
        (b_rows, b_cols)
    };

    if batch != b_batch || k != k_rhs {
        return Err(LinalgError::ShapeMismatch {
            op: "batched_matmul",
            left: a.shape.to_vec(),
            right: b.shape.to_vec(),
        });
    }

    let a_batches = a.outer_iter().collect::<Vec<_>>();
    let b_batches = b.outer_iter().collect::<Vec<_>>();

    let products = try_map_batches(strategy, batch, |i| {
        let lhs = slice_to_faer_mat(a_batches[i], a_rows, a_cols);
        let rhs = slice_to_faer_mat(b_batches[i], b_rows, b_cols);
        let lhs = if transpose.lhs() { lhs.transpose() } else { lhs };
        let rhs = if transpose.rhs() { rhs.transpose() } else { rhs };
        let product = lhs * rhs;
        Ok::<_, LinalgError>(faer_mat_to_vec(product.as_ref()))
    })?;

    Ok(Tensor3::from_shape_vec(
        [batch, m, n],
        products.into_iter().flatten().collect(),
    )?)
}

/// Compute the determinant of every square matrix in a stack.
///
/// # Arguments
///
/// * `a` - A stack of square matrices with shape `[B, D, D]`.
/// * `strategy` - How to distribute the batch elements.
///
/// # Returns
///
/// The determinants with shape `[B]`.
pub fn batched_determinant(
    a: &Tensor3<f64>,
    strategy: ExecutionStrategy,
) -> Result<Tensor1<f64>, LinalgError> {
    let [batch, rows, cols] = a.shape;
    if rows != cols {
        return Err(LinalgError::ShapeMismatch {
            op: "batched_determinant",
            left: vec![rows],
            right: vec![cols],
        });
    }

    let a_batches = a.outer_iter().collect::<Vec<_>>();
    let dets = try_map_batches(strategy, batch, |i| {
        Ok::<_, LinalgError>(slice_to_faer_mat(a_batches[i], rows, cols).determinant())
    })?;

    Ok(Tensor1::from_shape_vec([batch], dets)?)
}

/// Extract column `col` of every matrix in a stack as a `[B, R, 1]` stack.
pub fn batched_column(a: &Tensor3<f64>, col: usize) -> Result<Tensor3<f64>, LinalgError> {
    let [batch, rows, cols] = a.shape;
    if col >= cols {
        return Err(posealign_tensor::TensorError::index_out_of_bounds(col, cols).into());
    }
    Ok(Tensor3::from_shape_fn([batch, rows, 1], |[b, r, _]| {
        a.as_slice()[b * a.strides[0] + r * a.strides[1] + col]
    }))
}

/// Choose, per batch element, between two precomputed candidates.
///
/// Element `b` of the output is taken from `when_true` if `condition[b]` holds and from
/// `when_false` otherwise.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the candidates have different shapes or the condition length
/// differs from the batch size.
///
/// # Example
///
/// ```
/// use posealign_linalg::batched_select;
/// use posealign_tensor::Tensor2;
///
/// let a = Tensor2::from_shape_vec([2, 2], vec![1, 1, 2, 2]).unwrap();
/// let b = Tensor2::from_shape_vec([2, 2], vec![9, 9, 8, 8]).unwrap();
/// let out = batched_select(&[false, true], &a, &b).unwrap();
/// assert_eq!(out.as_slice(), &[9, 9, 2, 2]);
/// ```
pub fn batched_select<T: Clone, const N: usize>(
    condition: &[bool],
    when_true: &Tensor<T, N>,
    when_false: &Tensor<T, N>,
) -> Result<Tensor<T, N>, LinalgError> {
    if when_true.shape != when_false.shape || condition.len() != when_true.outer_len() {
        return Err(LinalgError::ShapeMismatch {
            op: "batched_select",
            left: when_true.shape.to_vec(),
            right: when_false.shape.to_vec(),
        });
    }

    let data = condition
        .iter()
        .zip(when_true.outer_iter().zip(when_false.outer_iter()))
        .flat_map(|(&c, (t, f))| {
            let chosen = if c { t } else { f };
            chosen.iter().cloned()
        })
        .collect();

    Ok(Tensor::from_shape_vec(when_true.shape, data)?)
}
