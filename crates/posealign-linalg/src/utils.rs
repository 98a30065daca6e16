/// Utility function to view a row-major slice as a faer matrix.
///
/// # Arguments
///
/// * `slice` - The matrix entries in row-major order.
/// * `nrows` - The number of rows.
/// * `ncols` - The number of columns.
///
/// PRECONDITION: `slice.len() == nrows * ncols`.
pub fn slice_to_faer_mat(slice: &[f64], nrows: usize, ncols: usize) -> faer::MatRef<'_, f64> {
    faer::mat::from_row_major_slice(slice, nrows, ncols)
}

/// Utility function to copy a faer matrix into a row-major vector.
pub fn faer_mat_to_vec(mat: faer::MatRef<'_, f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(mat.nrows() * mat.ncols());
    for i in 0..mat.nrows() {
        for j in 0..mat.ncols() {
            out.push(mat.read(i, j));
        }
    }
    out
}
