//! Dense reconstruction

use super::{core_item, item_dims};
use crate::dense::DenseTensor;
use crate::error::Result;
use crate::linalg::mat_mul;
use crate::parallel::try_map_indexed;
use crate::shapes;
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;
use crate::types::TTKind;

/// Contract all cores into the dense tensor or matrix they represent.
///
/// A TT-tensor with modes `(n_1, ..., n_d)` gives an array of that shape, a
/// TT-matrix gives a `(prod n_i, prod m_i)` matrix. A batch adds a leading
/// batch axis.
pub fn full<T: TTScalar>(tt: &TensorTrain<T>) -> Result<DenseTensor<T>> {
    let _span = tracing::trace_span!("full", ndims = tt.ndims()).entered();
    let items = tt.dims(0).batch;
    let per_item = try_map_indexed(items, |b| full_item(tt, b))?;
    let data = per_item.concat();
    DenseTensor::from_vec(data, &shapes::shape(tt))
}

/// Dense data of one batch item, row-major over the output shape
fn full_item<T: TTScalar>(tt: &TensorTrain<T>, b: usize) -> Result<Vec<T>> {
    // acc is a (rows, rank) matrix; rows run over the modes seen so far
    // in the interleaved order (n_1, m_1, n_2, m_2, ...).
    let first = item_dims(tt, 0);
    let mut acc = core_item(tt, 0, b).to_vec();
    let mut rows = first.left * first.modes();
    let mut rank = first.right;
    for k in 1..tt.ndims() {
        let dims = item_dims(tt, k);
        let cols = dims.modes() * dims.right;
        acc = mat_mul(&acc, rows, rank, core_item(tt, k, b), cols);
        rows *= dims.modes();
        rank = dims.right;
    }

    match tt.kind() {
        TTKind::Tensor => Ok(acc),
        TTKind::Matrix => {
            let d = tt.ndims();
            let interleaved: Vec<usize> = (0..d)
                .flat_map(|k| {
                    let dims = tt.dims(k);
                    [dims.rows, dims.cols]
                })
                .collect();
            let axes: Vec<usize> = (0..d).map(|k| 2 * k).chain((0..d).map(|k| 2 * k + 1)).collect();
            let grouped = DenseTensor::from_vec(acc, &interleaved)?.permute(&axes)?;
            Ok(grouped.into_vec())
        }
    }
}
