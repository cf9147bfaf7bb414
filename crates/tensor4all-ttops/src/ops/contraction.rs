//! Inner products, norms and bilinear forms
//!
//! All reductions sweep the cores from left to right, carrying a small
//! environment indexed by the current ranks of the operands, and never form
//! the dense tensors.

use super::gather::evaluate;
use super::matmul::{matmul, transpose};
use super::{core_item, item_dims};
use crate::dense::{unravel, DenseTensor};
use crate::error::{Result, TensorTrainError};
use crate::linalg::mat_mul;
use crate::parallel::map_indexed;
use crate::shapes::{check_same_modes, raw_shape, resolve_batch, resolve_batch_all};
use crate::sparse::SparseTensor;
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;
use crate::types::{Reduction, TTKind};

/// Sum of elementwise products of the flattened tensors.
///
/// No conjugation is applied. Batches give one value per item, with the
/// usual broadcasting of a batch of size 1.
///
/// # Errors
///
/// - `ShapeMismatch` if kinds or mode shapes differ
/// - `BatchSizeMismatch` if batch sizes differ and neither broadcasts
pub fn flat_inner<T: TTScalar>(a: &TensorTrain<T>, b: &TensorTrain<T>) -> Result<Reduction<T>> {
    let _span = tracing::trace_span!("flat_inner", ndims = a.ndims()).entered();
    check_same_modes(a, b, "flat_inner")?;
    let plan = resolve_batch(a, b)?;
    let values = map_indexed(plan.size, |item| inner_item(a, b, item, false));
    Ok(Reduction::from_values(values, plan.is_batch()))
}

/// Environment sweep for one batch item; `conj_a` conjugates `a`'s cores
fn inner_item<T: TTScalar>(a: &TensorTrain<T>, b: &TensorTrain<T>, item: usize, conj_a: bool) -> T {
    // env is (left rank of a, left rank of b)
    let mut env = vec![T::one()];
    for k in 0..a.ndims() {
        let (da, db) = (item_dims(a, k), item_dims(b, k));
        let (ca, cb) = (core_item(a, k, item), core_item(b, k, item));
        let modes = da.modes();

        let mut partial = vec![T::zero(); db.left * modes * da.right];
        for la in 0..da.left {
            for lb in 0..db.left {
                let e = env[la * db.left + lb];
                for q in 0..modes {
                    for ra in 0..da.right {
                        let x = ca[(la * modes + q) * da.right + ra];
                        let x = if conj_a { x.conj() } else { x };
                        let slot = &mut partial[(lb * modes + q) * da.right + ra];
                        *slot = *slot + e * x;
                    }
                }
            }
        }

        let mut next = vec![T::zero(); da.right * db.right];
        for lb in 0..db.left {
            for q in 0..modes {
                let row = &cb[(lb * modes + q) * db.right..(lb * modes + q + 1) * db.right];
                for ra in 0..da.right {
                    let p = partial[(lb * modes + q) * da.right + ra];
                    for (slot, &y) in next[ra * db.right..(ra + 1) * db.right].iter_mut().zip(row) {
                        *slot = *slot + p * y;
                    }
                }
            }
        }
        env = next;
    }
    env[0]
}

/// Dense shape of one item of `tt`: the mode sizes of a TT-tensor, or
/// `(prod rows, prod cols)` of a TT-matrix
fn item_shape<T: Copy>(tt: &TensorTrain<T>) -> Vec<usize> {
    let raw = raw_shape(tt);
    match tt.kind() {
        TTKind::Tensor => raw[0].clone(),
        TTKind::Matrix => vec![raw[0].iter().product(), raw[1].iter().product()],
    }
}

/// Inner product with a sparse tensor, evaluating `a` only at the stored
/// coordinates.
///
/// For a TT-matrix the sparse operand is a `(prod rows, prod cols)` matrix.
///
/// # Errors
///
/// `ShapeMismatch` if the sparse operand's dense shape differs from the
/// shape `a` represents.
pub fn tt_sparse_flat_inner<T: TTScalar>(
    a: &TensorTrain<T>,
    sparse: &SparseTensor<T>,
) -> Result<Reduction<T>> {
    let _span = tracing::trace_span!("tt_sparse_flat_inner", nnz = sparse.nnz()).entered();
    let expected = item_shape(a);
    if sparse.dense_shape() != expected.as_slice() {
        return Err(TensorTrainError::shape(format!(
            "sparse operand of shape {:?} against a tensor train of shape {expected:?}",
            sparse.dense_shape()
        )));
    }
    let raw = raw_shape(a);
    let coords: Vec<Vec<(usize, usize)>> = sparse
        .indices()
        .iter()
        .map(|index| match a.kind() {
            TTKind::Tensor => index.iter().map(|&i| (i, 0)).collect(),
            TTKind::Matrix => {
                let rows = unravel(index[0], &raw[0]);
                let cols = unravel(index[1], &raw[1]);
                rows.into_iter().zip(cols).collect()
            }
        })
        .collect();

    let values = map_indexed(a.dims(0).batch, |item| {
        coords
            .iter()
            .zip(sparse.values())
            .fold(T::zero(), |acc, (site, &v)| acc + evaluate(a, item, |k| site[k]) * v)
    });
    Ok(Reduction::from_values(values, a.is_batch()))
}

/// Inner product with a dense array of the shape `a` represents.
///
/// The array is swept core by core; it is never reconstructed on the TT
/// side.
///
/// # Errors
///
/// `ShapeMismatch` if the dense shape differs from the shape `a` represents.
pub fn tt_dense_flat_inner<T: TTScalar>(
    a: &TensorTrain<T>,
    dense: &DenseTensor<T>,
) -> Result<Reduction<T>> {
    let _span = tracing::trace_span!("tt_dense_flat_inner", len = dense.len()).entered();
    let expected = item_shape(a);
    if dense.shape() != expected.as_slice() {
        return Err(TensorTrainError::shape(format!(
            "dense operand of shape {:?} against a tensor train of shape {expected:?}",
            dense.shape()
        )));
    }
    // Bring a matrix into the interleaved mode order of the cores
    let flat = match a.kind() {
        TTKind::Tensor => dense.as_slice().to_vec(),
        TTKind::Matrix => {
            let raw = raw_shape(a);
            let d = a.ndims();
            let split: Vec<usize> = raw[0].iter().chain(&raw[1]).copied().collect();
            let axes: Vec<usize> = (0..d).flat_map(|k| [k, d + k]).collect();
            dense.reshape(&split)?.permute(&axes)?.into_vec()
        }
    };

    if flat.is_empty() {
        // a zero-size mode leaves no terms
        let values = vec![T::zero(); a.dims(0).batch];
        return Ok(Reduction::from_values(values, a.is_batch()));
    }

    let values = map_indexed(a.dims(0).batch, |item| {
        // state is (rank, remaining modes)
        let mut state = flat.clone();
        let mut rest = flat.len();
        for k in 0..a.ndims() {
            let dims = item_dims(a, k);
            let core = core_item(a, k, item);
            let modes = dims.modes();
            rest /= modes;
            let mut next = vec![T::zero(); dims.right * rest];
            for l in 0..dims.left {
                for q in 0..modes {
                    let src = &state[(l * modes + q) * rest..(l * modes + q + 1) * rest];
                    for r in 0..dims.right {
                        let c = core[(l * modes + q) * dims.right + r];
                        for (slot, &s) in next[r * rest..(r + 1) * rest].iter_mut().zip(src) {
                            *slot = *slot + c * s;
                        }
                    }
                }
            }
            state = next;
        }
        state[0]
    });
    Ok(Reduction::from_values(values, a.is_batch()))
}

/// Squared Frobenius norm, one value per batch item.
///
/// The default path contracts `a` with its conjugate. With `differentiable`
/// the cores are swept left to right through QR decompositions and the
/// norm is read from the last triangular factor, which avoids the
/// cancellation of the plain contraction for ill-conditioned inputs.
pub fn frobenius_norm_squared<T: TTScalar>(
    a: &TensorTrain<T>,
    differentiable: bool,
) -> Reduction<f64> {
    let _span = tracing::trace_span!("frobenius_norm_squared", differentiable).entered();
    let values = map_indexed(a.dims(0).batch, |item| {
        if differentiable {
            orthogonal_norm_sq(a, item)
        } else {
            inner_item(a, a, item, true).re()
        }
    });
    Reduction::from_values(values, a.is_batch())
}

fn orthogonal_norm_sq<T: TTScalar>(a: &TensorTrain<T>, item: usize) -> f64 {
    // r is the (r_rows, left rank) triangular factor carried so far
    let mut r = vec![T::one()];
    let mut r_rows = 1;
    for k in 0..a.ndims() {
        let dims = item_dims(a, k);
        let core = core_item(a, k, item);
        let merged = mat_mul(&r, r_rows, dims.left, core, dims.modes() * dims.right);
        let (next, rows) = T::r_factor(&merged, r_rows * dims.modes(), dims.right);
        r = next;
        r_rows = rows;
    }
    r.iter().map(|x| x.abs_sq()).sum()
}

/// Frobenius norm, one value per batch item, never negative
pub fn frobenius_norm<T: TTScalar>(a: &TensorTrain<T>, differentiable: bool) -> Reduction<f64> {
    frobenius_norm_squared(a, differentiable).map(|v| v.max(0.0).sqrt())
}

/// `b^T A c` for a TT-matrix `A` and TT-vectors `b` and `c`.
///
/// Any operand may be a batch; the result then holds one value per item.
///
/// # Errors
///
/// - `UnsupportedOperands` if `a` is not a TT-matrix or `b`, `c` are not
///   TT-vectors
/// - `ShapeMismatch` if `A`'s row modes differ from `b`'s or its column
///   modes from `c`'s
/// - `BatchSizeMismatch` if batch sizes differ and neither broadcasts
pub fn bilinear_form<T: TTScalar>(
    a: &TensorTrain<T>,
    b: &TensorTrain<T>,
    c: &TensorTrain<T>,
) -> Result<Reduction<T>> {
    let _span = tracing::trace_span!("bilinear_form", ndims = a.ndims()).entered();
    if !a.is_matrix() || !b.is_vector() || !c.is_vector() {
        return Err(TensorTrainError::unsupported(
            "bilinear_form needs a TT-matrix and two TT-vectors",
        ));
    }
    let (sa, sb, sc) = (raw_shape(a), raw_shape(b), raw_shape(c));
    if sa[0] != sb[0] || sa[1] != sc[0] {
        return Err(TensorTrainError::shape(format!(
            "bilinear_form: matrix modes {:?} x {:?} against vectors {:?} and {:?}",
            sa[0], sa[1], sb[0], sc[0]
        )));
    }
    let plan = resolve_batch_all(&[
        (a.declared_batch_size(), a.dims(0).batch),
        (b.declared_batch_size(), b.dims(0).batch),
        (c.declared_batch_size(), c.dims(0).batch),
    ])?;
    let values = map_indexed(plan.size, |item| bilinear_item(a, b, c, item));
    Ok(Reduction::from_values(values, plan.is_batch()))
}

fn bilinear_item<T: TTScalar>(
    a: &TensorTrain<T>,
    b: &TensorTrain<T>,
    c: &TensorTrain<T>,
    item: usize,
) -> T {
    // env is (rank of A, rank of b, rank of c)
    let mut env = vec![T::one()];
    for k in 0..a.ndims() {
        let (da, db, dc) = (item_dims(a, k), item_dims(b, k), item_dims(c, k));
        let (ca, cb, cc) = (core_item(a, k, item), core_item(b, k, item), core_item(c, k, item));
        let (n, m) = (da.rows, da.cols);

        // t1[la, lc, i, rb] = sum_lb env[la, lb, lc] b[lb, i, rb]
        let mut t1 = vec![T::zero(); da.left * dc.left * n * db.right];
        for la in 0..da.left {
            for lb in 0..db.left {
                for lc in 0..dc.left {
                    let e = env[(la * db.left + lb) * dc.left + lc];
                    for i in 0..n {
                        for rb in 0..db.right {
                            let slot = &mut t1[((la * dc.left + lc) * n + i) * db.right + rb];
                            *slot = *slot + e * cb[(lb * n + i) * db.right + rb];
                        }
                    }
                }
            }
        }

        // t2[lc, rb, j, ra] = sum_{la, i} t1[la, lc, i, rb] A[la, i, j, ra]
        let mut t2 = vec![T::zero(); dc.left * db.right * m * da.right];
        for la in 0..da.left {
            for lc in 0..dc.left {
                for i in 0..n {
                    for rb in 0..db.right {
                        let t = t1[((la * dc.left + lc) * n + i) * db.right + rb];
                        for j in 0..m {
                            for ra in 0..da.right {
                                let slot = &mut t2[((lc * db.right + rb) * m + j) * da.right + ra];
                                *slot = *slot + t * ca[da.offset(0, la, i, j, ra)];
                            }
                        }
                    }
                }
            }
        }

        // next[ra, rb, rc] = sum_{lc, j} t2[lc, rb, j, ra] c[lc, j, rc]
        let mut next = vec![T::zero(); da.right * db.right * dc.right];
        for lc in 0..dc.left {
            for rb in 0..db.right {
                for j in 0..m {
                    for ra in 0..da.right {
                        let t = t2[((lc * db.right + rb) * m + j) * da.right + ra];
                        for rc in 0..dc.right {
                            let slot = &mut next[(ra * db.right + rb) * dc.right + rc];
                            *slot = *slot + t * cc[(lc * m + j) * dc.right + rc];
                        }
                    }
                }
            }
        }
        env = next;
    }
    env[0]
}

/// Same as [`bilinear_form`]
pub fn quadratic_form<T: TTScalar>(
    a: &TensorTrain<T>,
    b: &TensorTrain<T>,
    c: &TensorTrain<T>,
) -> Result<Reduction<T>> {
    bilinear_form(a, b, c)
}

/// `x^T A B^T y` for TT-matrices `A`, `B` and TT-vectors `x`, `y`, without
/// forming any dense operand
pub fn bilinear_form_two_mat<T: TTScalar>(
    x: &TensorTrain<T>,
    a: &TensorTrain<T>,
    b: &TensorTrain<T>,
    y: &TensorTrain<T>,
) -> Result<Reduction<T>> {
    let ab = matmul(a, &transpose(b)?)?;
    bilinear_form(&ab, x, y)
}
