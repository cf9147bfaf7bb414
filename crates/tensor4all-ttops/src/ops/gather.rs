//! Element lookup without reconstruction

use super::{core_item, item_dims};
use crate::dense::DenseTensor;
use crate::error::{Result, TensorTrainError};
use crate::parallel::try_map_indexed;
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;

/// Value of batch item `b` at the per-core coordinates `coords(k) = (row, col)`.
///
/// Chains the selected `left x right` slices from left to right; tensor
/// cores take `col = 0`. Coordinates must already be in range.
pub(crate) fn evaluate<T, F>(tt: &TensorTrain<T>, b: usize, coords: F) -> T
where
    T: TTScalar,
    F: Fn(usize) -> (usize, usize),
{
    let mut v = vec![T::one()];
    for k in 0..tt.ndims() {
        let dims = item_dims(tt, k);
        let data = core_item(tt, k, b);
        let (i, j) = coords(k);
        let mut next = vec![T::zero(); dims.right];
        for (l, &vl) in v.iter().enumerate() {
            let start = dims.offset(0, l, i, j, 0);
            for (acc, &c) in next.iter_mut().zip(&data[start..start + dims.right]) {
                *acc = *acc + vl * c;
            }
        }
        v = next;
    }
    v[0]
}

/// Values of a TT-tensor (or a batch of them) at the given multi-indices.
///
/// Each index has one entry per mode, preceded by a batch index when `tt`
/// is a batch.
///
/// # Errors
///
/// - `UnsupportedOperands` for a TT-matrix
/// - `IndexLengthMismatch` for an index of the wrong arity
/// - `IndexOutOfBounds` for a coordinate past its axis
pub fn gather_nd<T, I>(tt: &TensorTrain<T>, indices: &[I]) -> Result<Vec<T>>
where
    T: TTScalar,
    I: AsRef<[usize]> + Sync,
{
    let _span = tracing::trace_span!("gather_nd", queries = indices.len()).entered();
    if tt.is_matrix() {
        return Err(TensorTrainError::unsupported(
            "gather_nd expects a TT-tensor, got a TT-matrix",
        ));
    }
    let offset = usize::from(tt.is_batch());
    let arity = tt.ndims() + offset;
    let items = tt.dims(0).batch;

    for index in indices {
        let index = index.as_ref();
        if index.len() != arity {
            return Err(TensorTrainError::IndexLengthMismatch {
                expected: arity,
                got: index.len(),
            });
        }
        for (site, &i) in index.iter().enumerate() {
            let max = if site < offset {
                items
            } else {
                tt.dims(site - offset).rows
            };
            if i >= max {
                return Err(TensorTrainError::IndexOutOfBounds { site, index: i, max });
            }
        }
    }

    try_map_indexed(indices.len(), |q| {
        let index = indices[q].as_ref();
        let b = if offset == 1 { index[0] } else { 0 };
        Ok(evaluate(tt, b, |k| (index[k + offset], 0)))
    })
}

/// [`gather_nd`] with indices supplied as a runtime `(N, d)` integer array
/// (`(N, d + 1)` for a batch)
///
/// # Errors
///
/// As [`gather_nd`], plus `ShapeMismatch` when `indices` is not 2-D and
/// `NegativeIndex` for a negative entry.
pub fn gather_nd_array<T: TTScalar>(
    tt: &TensorTrain<T>,
    indices: &DenseTensor<i64>,
) -> Result<Vec<T>> {
    let &[count, arity] = indices.shape() else {
        return Err(TensorTrainError::shape(format!(
            "index array must have shape (N, d), got {:?}",
            indices.shape()
        )));
    };
    let mut rows = Vec::with_capacity(count);
    for q in 0..count {
        let row = indices.as_slice()[q * arity..(q + 1) * arity]
            .iter()
            .enumerate()
            .map(|(site, &value)| {
                usize::try_from(value).map_err(|_| TensorTrainError::NegativeIndex {
                    position: q * arity + site,
                    value,
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        rows.push(row);
    }
    gather_nd(tt, &rows)
}
