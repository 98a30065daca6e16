use thiserror::Error;

/// An error type for tensor operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// Tensor shape does not match the provided data.
    ///
    /// The product of the shape dimensions must equal the number of elements.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Tensor dimensions incompatible for the requested operation.
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },
}

impl TensorError {
    /// Creates an `InvalidShape` error.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an `IndexOutOfBounds` error.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a `DimensionMismatch` error from two shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

/// Compute the strides from the shape of a tensor.
///
/// # Arguments
///
/// * `shape` - The shape of the tensor.
///
/// # Returns
///
/// * `strides` - The strides of the tensor in row-major order.
///
/// # Example
///
/// ```
/// use posealign_tensor::tensor::get_strides_from_shape;
///
/// let strides = get_strides_from_shape([2, 3, 4]);
/// assert_eq!(strides, [12, 4, 1]);
/// ```
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// A multi-dimensional array with owned, contiguous, row-major data.
///
/// The rank `N` is checked at compile time; the sizes of each dimension are checked at
/// construction time.
///
/// # Type Parameters
///
/// * `T` - The element type stored in the tensor
/// * `N` - The number of dimensions
///
/// # Examples
///
/// ```rust
/// use posealign_tensor::Tensor2;
///
/// let t = Tensor2::from_shape_vec([2, 2], vec![1u8, 2, 3, 4]).unwrap();
/// assert_eq!(t.shape, [2, 2]);
/// assert_eq!(t.get([1, 0]), Some(&3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T, const N: usize> {
    pub(crate) data: Vec<T>,
    /// The shape of the tensor.
    pub shape: [usize; N],
    /// The strides of the tensor data in memory.
    pub strides: [usize; N],
}

impl<T, const N: usize> Tensor<T, N> {
    /// Creates a new `Tensor` with the given shape and data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use posealign_tensor::Tensor3;
    ///
    /// let t = Tensor3::from_shape_vec([1, 2, 3], vec![0.0f64; 6]).unwrap();
    /// assert_eq!(t.strides, [6, 3, 1]);
    /// ```
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        let strides = get_strides_from_shape(shape);
        Ok(Self {
            data,
            shape,
            strides,
        })
    }

    /// Creates a new `Tensor` with the given shape and a slice of data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an error is returned.
    pub fn from_shape_slice(shape: [usize; N], data: &[T]) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        Self::from_shape_vec(shape, data.to_vec())
    }

    /// Creates a new `Tensor` with the given shape, filled with a constant value.
    pub fn from_shape_val(shape: [usize; N], value: T) -> Self
    where
        T: Clone,
    {
        let numel = shape.iter().product::<usize>();
        Self {
            data: vec![value; numel],
            shape,
            strides: get_strides_from_shape(shape),
        }
    }

    /// Creates a new `Tensor` with the given shape, evaluating `f` at every index.
    ///
    /// # Example
    ///
    /// ```
    /// use posealign_tensor::Tensor2;
    ///
    /// let eye = Tensor2::from_shape_fn([3, 3], |[i, j]| if i == j { 1.0 } else { 0.0 });
    /// assert_eq!(eye.as_slice(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    /// ```
    pub fn from_shape_fn<F>(shape: [usize; N], f: F) -> Self
    where
        F: Fn([usize; N]) -> T,
    {
        let numel = shape.iter().product::<usize>();
        let strides = get_strides_from_shape(shape);
        let data = (0..numel)
            .map(|offset| f(unravel_index(offset, &shape, &strides)))
            .collect();
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Creates a new `Tensor` with the given shape filled with zeros.
    pub fn zeros(shape: [usize; N]) -> Self
    where
        T: num_traits::Zero + Clone,
    {
        Self::from_shape_val(shape, T::zero())
    }

    /// Returns the data of the tensor as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the data of the tensor as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the tensor and returns the underlying vector.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Returns the offset of the element at the given index, if it is in bounds.
    pub fn get_iter_offset(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = 0;
        for ((&idx, &dim_size), &stride) in index.iter().zip(self.shape.iter()).zip(&self.strides)
        {
            if idx >= dim_size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Returns a reference to the element at the given index, if it is in bounds.
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        self.get_iter_offset(index).map(|offset| &self.data[offset])
    }

    /// Returns a mutable reference to the element at the given index, if it is in bounds.
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        self.get_iter_offset(index)
            .map(move |offset| &mut self.data[offset])
    }

    /// Applies `f` element-wise, returning a new tensor with the same shape.
    pub fn map<U, F>(&self, f: F) -> Tensor<U, N>
    where
        F: Fn(&T) -> U,
    {
        Tensor {
            data: self.data.iter().map(f).collect(),
            shape: self.shape,
            strides: self.strides,
        }
    }

    /// Returns the size of the leading (batch) axis.
    ///
    /// PRECONDITION: `N >= 1`.
    #[inline]
    pub fn outer_len(&self) -> usize {
        self.shape[0]
    }

    /// Returns the contiguous sub-slice of the `index`-th element along the leading axis.
    pub fn outer(&self, index: usize) -> Option<&[T]> {
        if index >= self.shape[0] {
            return None;
        }
        let stride = self.strides[0];
        Some(&self.data[index * stride..(index + 1) * stride])
    }

    /// Returns the mutable sub-slice of the `index`-th element along the leading axis.
    pub fn outer_mut(&mut self, index: usize) -> Option<&mut [T]> {
        if index >= self.shape[0] {
            return None;
        }
        let stride = self.strides[0];
        Some(&mut self.data[index * stride..(index + 1) * stride])
    }

    /// Iterates over the elements of the leading axis as slices.
    pub fn outer_iter(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        let stride = self.strides[0];
        let len = self.shape[0];
        (0..len).map(move |i| &self.data[i * stride..(i + 1) * stride])
    }

    /// Iterates mutably over the elements of the leading axis as slices.
    pub fn outer_iter_mut(&mut self) -> std::slice::ChunksExactMut<'_, T> {
        // chunks_exact_mut rejects a zero chunk size; empty inner dims yield no chunks anyway
        let stride = self.strides[0].max(1);
        self.data.chunks_exact_mut(stride)
    }
}

impl<T: Copy> Tensor<T, 3> {
    /// Creates a `[batch, n_points, dim]` tensor from per-example point lists.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the point lists do not all have the same length.
    ///
    /// # Example
    ///
    /// ```
    /// use posealign_tensor::Tensor3;
    ///
    /// let t = Tensor3::from_point_sets(&[vec![[1.0, 2.0], [3.0, 4.0]]]).unwrap();
    /// assert_eq!(t.shape, [1, 2, 2]);
    /// assert_eq!(t.get([0, 1, 0]), Some(&3.0));
    /// ```
    pub fn from_point_sets<const D: usize>(sets: &[Vec<[T; D]>]) -> Result<Self, TensorError> {
        let n_points = sets.first().map_or(0, |s| s.len());
        let mut data = Vec::with_capacity(sets.len() * n_points * D);
        for set in sets {
            if set.len() != n_points {
                return Err(TensorError::dimension_mismatch(
                    "all point sets must have the same number of points",
                    &[n_points, D],
                    &[set.len(), D],
                ));
            }
            data.extend(set.iter().flatten().copied());
        }
        Self::from_shape_vec([sets.len(), n_points, D], data)
    }
}

fn unravel_index<const N: usize>(
    mut offset: usize,
    shape: &[usize; N],
    strides: &[usize; N],
) -> [usize; N] {
    let mut index = [0; N];
    for i in 0..N {
        if shape[i] == 0 {
            continue;
        }
        index[i] = offset / strides[i];
        offset %= strides[i];
    }
    index
}
