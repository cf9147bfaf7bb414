//! Matrix products and transposition of TT-matrices

use super::{core_item, full, item_dims};
use crate::dense::DenseTensor;
use crate::error::{Result, TensorTrainError};
use crate::parallel::try_map_indexed;
use crate::shapes::{raw_shape, resolve_batch};
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;
use crate::types::CoreDims;

/// Matrix product of two TT-matrices (or batches of them).
///
/// Core `k` of the result contracts `a`'s `(r, n, p, s)` with `b`'s
/// `(r', p, m, s')` over `p`, giving `(r r', n, m, s s')`. Each output
/// element is one sum over the shared mode index.
///
/// # Errors
///
/// - `UnsupportedOperands` unless both operands are TT-matrices
/// - `ShapeMismatch` if the core counts differ or the column modes of `a`
///   are not the row modes of `b`
/// - `BatchSizeMismatch` if batch sizes differ and neither broadcasts
pub fn matmul<T: TTScalar>(a: &TensorTrain<T>, b: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    let _span = tracing::trace_span!("matmul", ndims = a.ndims()).entered();
    if !a.is_matrix() || !b.is_matrix() {
        return Err(TensorTrainError::unsupported(format!(
            "matmul needs two TT-matrices, got TT-{:?} and TT-{:?}",
            a.kind(),
            b.kind()
        )));
    }
    let (sa, sb) = (raw_shape(a), raw_shape(b));
    if sa[1] != sb[0] {
        return Err(TensorTrainError::shape(format!(
            "matmul: column modes {:?} of the left operand differ from row modes {:?} of the right",
            sa[1], sb[0]
        )));
    }
    let plan = resolve_batch(a, b)?;

    let parts = try_map_indexed(a.ndims(), |k| {
        let (da, db) = (item_dims(a, k), item_dims(b, k));
        let dims = CoreDims {
            batch: plan.size,
            left: da.left * db.left,
            rows: da.rows,
            cols: db.cols,
            right: da.right * db.right,
        };
        let mut data = vec![T::zero(); dims.batch * dims.item_len()];
        for item in 0..plan.size {
            let (ca, cb) = (core_item(a, k, item), core_item(b, k, item));
            for la in 0..da.left {
                for lb in 0..db.left {
                    for i in 0..da.rows {
                        for j in 0..db.cols {
                            for ra in 0..da.right {
                                let to = dims.offset(item, la * db.left + lb, i, j, ra * db.right);
                                for rb in 0..db.right {
                                    let mut acc = T::zero();
                                    for p in 0..da.cols {
                                        acc = acc
                                            + ca[da.offset(0, la, i, p, ra)]
                                                * cb[db.offset(0, lb, p, j, rb)];
                                    }
                                    data[to + rb] = acc;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok((dims, data))
    })?;

    let ranks = a
        .declared_ranks()
        .iter()
        .zip(b.declared_ranks())
        .map(|(&ra, &rb)| ra.product(rb))
        .collect();
    TensorTrain::assemble(a.kind(), plan.declared, ranks, parts)
}

/// Swap row and column modes in every core of a TT-matrix
///
/// # Errors
///
/// `UnsupportedOperands` for a TT-tensor.
pub fn transpose<T: TTScalar>(a: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    if !a.is_matrix() {
        return Err(TensorTrainError::unsupported(
            "transpose is defined for TT-matrices only",
        ));
    }
    let parts = try_map_indexed(a.ndims(), |k| {
        let src = a.dims(k);
        let dims = CoreDims {
            rows: src.cols,
            cols: src.rows,
            ..src
        };
        let data = a.core(k).as_slice();
        let mut out = vec![T::zero(); data.len()];
        for b in 0..src.batch {
            for l in 0..src.left {
                for i in 0..src.rows {
                    for j in 0..src.cols {
                        let from = src.offset(b, l, i, j, 0);
                        let to = dims.offset(b, l, j, i, 0);
                        out[to..to + src.right].copy_from_slice(&data[from..from + src.right]);
                    }
                }
            }
        }
        Ok((dims, out))
    })?;
    TensorTrain::assemble(
        a.kind(),
        a.declared_batch_size(),
        a.declared_ranks().to_vec(),
        parts,
    )
}

/// TT-matrix times dense matrix, by reconstructing `a` first.
///
/// This materializes `a` in full and loses the benefit of the compressed
/// format; a warning is logged on every call. `dense` is `(N, K)` or a
/// batch `(B, N, K)` matching `a`'s batch.
pub fn matmul_tt_dense<T: TTScalar>(
    a: &TensorTrain<T>,
    dense: &DenseTensor<T>,
) -> Result<DenseTensor<T>> {
    if !a.is_matrix() {
        return Err(TensorTrainError::unsupported(
            "matmul with a dense operand needs a TT-matrix",
        ));
    }
    tracing::warn!(
        shape = ?crate::shapes::shape(a),
        "matmul_tt_dense materializes the TT-matrix"
    );
    full(a)?.matmul(dense)
}

/// Dense matrix times TT-matrix, by reconstructing `b` first.
///
/// Same cost caveat as [`matmul_tt_dense`].
pub fn matmul_dense_tt<T: TTScalar>(
    dense: &DenseTensor<T>,
    b: &TensorTrain<T>,
) -> Result<DenseTensor<T>> {
    if !b.is_matrix() {
        return Err(TensorTrainError::unsupported(
            "matmul with a dense operand needs a TT-matrix",
        ));
    }
    tracing::warn!(
        shape = ?crate::shapes::shape(b),
        "matmul_dense_tt materializes the TT-matrix"
    );
    dense.matmul(&full(b)?)
}
