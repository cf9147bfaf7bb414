//! Coordinate-format sparse operand

use crate::dense::DenseTensor;
use crate::error::{Result, TensorTrainError};
use num_traits::Zero;

/// Sparse tensor in coordinate (COO) format.
///
/// Duplicate coordinates are allowed; they contribute additively.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor<T> {
    indices: Vec<Vec<usize>>,
    values: Vec<T>,
    dense_shape: Vec<usize>,
}

impl<T: Copy> SparseTensor<T> {
    /// Create a sparse tensor, checking every coordinate against `dense_shape`
    pub fn new(indices: Vec<Vec<usize>>, values: Vec<T>, dense_shape: &[usize]) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(TensorTrainError::InvalidOperation {
                message: format!(
                    "{} coordinates given for {} values",
                    indices.len(),
                    values.len()
                ),
            });
        }
        for index in &indices {
            if index.len() != dense_shape.len() {
                return Err(TensorTrainError::IndexLengthMismatch {
                    expected: dense_shape.len(),
                    got: index.len(),
                });
            }
            for (site, (&i, &n)) in index.iter().zip(dense_shape).enumerate() {
                if i >= n {
                    return Err(TensorTrainError::IndexOutOfBounds {
                        site,
                        index: i,
                        max: n,
                    });
                }
            }
        }
        Ok(Self {
            indices,
            values,
            dense_shape: dense_shape.to_vec(),
        })
    }

    /// Coordinates of the stored values
    pub fn indices(&self) -> &[Vec<usize>] {
        &self.indices
    }

    /// Stored values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Shape of the dense tensor this represents
    pub fn dense_shape(&self) -> &[usize] {
        &self.dense_shape
    }

    /// Number of stored values
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl<T: Copy + Zero + std::ops::Add<Output = T>> SparseTensor<T> {
    /// Materialize as a dense array
    pub fn to_dense(&self) -> Result<DenseTensor<T>> {
        let mut dense = vec![T::zero(); self.dense_shape.iter().product()];
        let strides = crate::dense::strides(&self.dense_shape);
        for (index, &value) in self.indices.iter().zip(&self.values) {
            let flat: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
            dense[flat] = dense[flat] + value;
        }
        DenseTensor::from_vec(dense, &self.dense_shape)
    }
}
