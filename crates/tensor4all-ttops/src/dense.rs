//! Dense row-major multi-dimensional arrays
//!
//! `DenseTensor` is the array type backing every core and every dense
//! operand or result. It is a flat `Vec` plus a shape, with just the
//! operations the algebra needs: reshape, axis permutation, (batched)
//! matrix products, stacking and concatenation.

use crate::error::{Result, TensorTrainError};
use crate::linalg::mat_mul;
use crate::traits::TTScalar;
use num_traits::Zero;

/// Dense array stored in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor<T> {
    data: Vec<T>,
    shape: Vec<usize>,
}

/// Row-major strides for `shape`
pub(crate) fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Split a flat row-major position into a multi-index
pub(crate) fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for axis in (0..shape.len()).rev() {
        index[axis] = flat % shape[axis];
        flat /= shape[axis];
    }
    index
}

impl<T> DenseTensor<T> {
    /// Create from flat row-major data and a shape
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorTrainError::shape(format!(
                "{} elements cannot fill shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
        })
    }

    /// Create by evaluating `f` at every multi-index in row-major order
    pub fn from_fn<F: FnMut(&[usize]) -> T>(shape: &[usize], mut f: F) -> Self {
        let len: usize = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let mut index = vec![0; shape.len()];
        for _ in 0..len {
            data.push(f(&index));
            for axis in (0..shape.len()).rev() {
                index[axis] += 1;
                if index[axis] < shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Self {
            data,
            shape: shape.to_vec(),
        }
    }

    /// Zero-dimensional array holding one value
    pub fn scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
        }
    }

    /// Shape of the array
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Extent of one axis
    pub fn dim(&self, axis: usize) -> usize {
        self.shape[axis]
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat row-major data
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume into flat row-major data
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at a multi-index
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let flat = index
            .iter()
            .zip(strides(&self.shape))
            .map(|(i, s)| i * s)
            .sum::<usize>();
        self.data.get(flat)
    }

    /// Same data under a new shape with equal element count
    pub fn into_shape(self, shape: &[usize]) -> Result<Self> {
        Self::from_vec(self.data, shape)
    }

    /// Apply `f` elementwise
    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> DenseTensor<U> {
        DenseTensor {
            data: self.data.iter().map(f).collect(),
            shape: self.shape.clone(),
        }
    }
}

impl<T: Copy> DenseTensor<T> {
    /// Copy with a new shape of equal element count
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        Self::from_vec(self.data.clone(), shape)
    }

    /// Permute axes: axis `k` of the result is axis `axes[k]` of `self`
    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        let ndim = self.ndim();
        let mut seen = vec![false; ndim];
        let repeated = |a: usize, seen: &mut [bool]| std::mem::replace(&mut seen[a], true);
        if axes.len() != ndim || axes.iter().any(|&a| a >= ndim || repeated(a, &mut seen)) {
            return Err(TensorTrainError::InvalidOperation {
                message: format!("{axes:?} is not a permutation of {ndim} axes"),
            });
        }
        let src_strides = strides(&self.shape);
        let new_shape: Vec<usize> = axes.iter().map(|&a| self.shape[a]).collect();
        let moved_strides: Vec<usize> = axes.iter().map(|&a| src_strides[a]).collect();
        let out = Self::from_fn(&new_shape, |index| {
            let flat: usize = index.iter().zip(&moved_strides).map(|(i, s)| i * s).sum();
            self.data[flat]
        });
        Ok(out)
    }

    /// Matrix transpose of a 2-D array
    pub fn transpose(&self) -> Result<Self> {
        if self.ndim() != 2 {
            return Err(TensorTrainError::shape(format!(
                "transpose expects a matrix, got shape {:?}",
                self.shape
            )));
        }
        self.permute(&[1, 0])
    }

    /// Stack equally shaped arrays along a new leading axis
    pub fn stack(items: &[Self]) -> Result<Self> {
        let first = items.first().ok_or(TensorTrainError::Empty)?;
        let mut data = Vec::with_capacity(first.len() * items.len());
        for item in items {
            if item.shape != first.shape {
                return Err(TensorTrainError::shape(format!(
                    "cannot stack shapes {:?} and {:?}",
                    first.shape, item.shape
                )));
            }
            data.extend_from_slice(&item.data);
        }
        let mut shape = Vec::with_capacity(first.ndim() + 1);
        shape.push(items.len());
        shape.extend_from_slice(&first.shape);
        Self::from_vec(data, &shape)
    }

    /// Concatenate arrays along an existing axis
    pub fn concatenate(items: &[Self], axis: usize) -> Result<Self> {
        let first = items.first().ok_or(TensorTrainError::Empty)?;
        if axis >= first.ndim() {
            return Err(TensorTrainError::InvalidOperation {
                message: format!("axis {axis} out of range for {} axes", first.ndim()),
            });
        }
        for item in items {
            let agrees = item.ndim() == first.ndim()
                && item
                    .shape
                    .iter()
                    .zip(&first.shape)
                    .enumerate()
                    .all(|(k, (a, b))| k == axis || a == b);
            if !agrees {
                return Err(TensorTrainError::shape(format!(
                    "cannot concatenate shapes {:?} and {:?} along axis {axis}",
                    first.shape, item.shape
                )));
            }
        }
        let outer: usize = first.shape[..axis].iter().product();
        let mut shape = first.shape.clone();
        shape[axis] = items.iter().map(|t| t.shape[axis]).sum();
        let mut data = Vec::with_capacity(shape.iter().product());
        for o in 0..outer {
            for item in items {
                let block: usize = item.shape[axis..].iter().product();
                data.extend_from_slice(&item.data[o * block..(o + 1) * block]);
            }
        }
        Self::from_vec(data, &shape)
    }
}

impl<T: Clone + Zero> DenseTensor<T> {
    /// Create a zero-filled array
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: vec![T::zero(); shape.iter().product()],
            shape: shape.to_vec(),
        }
    }
}

impl<T: TTScalar> DenseTensor<T> {
    /// Matrix product.
    ///
    /// Accepts `(m, k) x (k, n)` and the batched forms `(B, m, k) x (k, n)`,
    /// `(m, k) x (B, k, n)` and `(B, m, k) x (B', k, n)` where the batch
    /// extents are equal or one of them is 1.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        let (batch_a, m, k) = matrix_parts(self)?;
        let (batch_b, k2, n) = matrix_parts(other)?;
        if k != k2 {
            return Err(TensorTrainError::shape(format!(
                "matmul of {:?} and {:?}: inner extents {k} and {k2} differ",
                self.shape, other.shape
            )));
        }
        let batch = match (batch_a, batch_b) {
            (None, None) => None,
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (Some(a), Some(b)) if a == b || b == 1 => Some(a),
            (Some(1), Some(b)) => Some(b),
            (Some(a), Some(b)) => {
                return Err(TensorTrainError::BatchSizeMismatch { left: a, right: b })
            }
        };
        let items = batch.unwrap_or(1);
        let mut data = Vec::with_capacity(items * m * n);
        for b in 0..items {
            let ia = if batch_a.unwrap_or(1) == 1 { 0 } else { b };
            let ib = if batch_b.unwrap_or(1) == 1 { 0 } else { b };
            let lhs = &self.data[ia * m * k..(ia + 1) * m * k];
            let rhs = &other.data[ib * k * n..(ib + 1) * k * n];
            data.extend(mat_mul(lhs, m, k, rhs, n));
        }
        let shape = match batch {
            Some(b) => vec![b, m, n],
            None => vec![m, n],
        };
        Self::from_vec(data, &shape)
    }

    /// Sum of squared magnitudes of all elements
    pub fn norm_sq(&self) -> f64 {
        self.data.iter().map(|v| v.abs_sq()).sum()
    }

    /// Largest elementwise distance to an equally shaped array
    pub fn max_abs_diff(&self, other: &Self) -> Result<f64> {
        if self.shape != other.shape {
            return Err(TensorTrainError::shape(format!(
                "cannot compare shapes {:?} and {:?}",
                self.shape, other.shape
            )));
        }
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (*a - *b).abs_val())
            .fold(0.0, f64::max))
    }
}

fn matrix_parts<T>(t: &DenseTensor<T>) -> Result<(Option<usize>, usize, usize)> {
    match t.shape() {
        [m, k] => Ok((None, *m, *k)),
        [b, m, k] => Ok((Some(*b), *m, *k)),
        other => Err(TensorTrainError::shape(format!(
            "matmul expects 2 or 3 axes, got shape {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(shape: &[usize]) -> DenseTensor<f64> {
        let len: usize = shape.iter().product();
        DenseTensor::from_vec((0..len).map(|x| x as f64).collect(), shape).unwrap()
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(DenseTensor::from_vec(vec![1.0, 2.0, 3.0], &[2, 2]).is_err());
    }

    #[test]
    fn test_get_row_major() {
        let t = arange(&[2, 3, 4]);
        assert_eq!(*t.get(&[0, 0, 1]).unwrap(), 1.0);
        assert_eq!(*t.get(&[0, 1, 0]).unwrap(), 4.0);
        assert_eq!(*t.get(&[1, 2, 3]).unwrap(), 23.0);
        assert!(t.get(&[2, 0, 0]).is_none());
        assert!(t.get(&[0, 0]).is_none());
    }

    #[test]
    fn test_permute() {
        let t = arange(&[2, 3, 4]);
        let p = t.permute(&[2, 0, 1]).unwrap();
        assert_eq!(p.shape(), &[4, 2, 3]);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(p.get(&[k, i, j]), t.get(&[i, j, k]));
                }
            }
        }
        assert!(t.permute(&[0, 0, 1]).is_err());
    }

    #[test]
    fn test_matmul_plain_and_batched() {
        let a = DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = DenseTensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);

        let batch = DenseTensor::stack(&[a.clone(), b.clone()]).unwrap();
        let cb = batch.matmul(&b).unwrap();
        assert_eq!(cb.shape(), &[2, 2, 2]);
        assert_eq!(&cb.as_slice()[..4], c.as_slice());

        let bad = arange(&[3, 2, 2]);
        assert!(matches!(
            batch.matmul(&bad),
            Err(TensorTrainError::BatchSizeMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_concatenate() {
        let a = arange(&[2, 1]);
        let b = arange(&[2, 2]);
        let c = DenseTensor::concatenate(&[a, b], 1).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c.as_slice(), &[0.0, 0.0, 1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unravel_and_strides() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(unravel(23, &[2, 3, 4]), vec![1, 2, 3]);
        assert_eq!(unravel(5, &[2, 3]), vec![1, 2]);
    }
}
