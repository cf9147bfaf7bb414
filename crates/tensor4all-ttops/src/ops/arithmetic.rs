//! Sums and elementwise products
//!
//! Both combinators build every output core independently. With `Lb` and
//! `Rb` the ranks contributed by `b`:
//!
//! - `add` places the cores block-diagonally, so ranks add. The first core
//!   is concatenated along its right rank and the last along its left rank.
//! - `multiply` takes the Kronecker product of the rank axes for every mode
//!   slot, so ranks multiply.

use super::{core_item, item_dims};
use crate::error::Result;
use crate::parallel::try_map_indexed;
use crate::shapes::{check_same_modes, resolve_batch, BatchPlan};
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;
use crate::types::{CoreDims, Dim};

/// Sum of two tensor trains of the same kind and mode shape.
///
/// Ranks of the result are the sums of the operand ranks.
///
/// # Errors
///
/// - `ShapeMismatch` if kinds or mode shapes differ
/// - `BatchSizeMismatch` if batch sizes differ and neither broadcasts
pub fn add<T: TTScalar>(a: &TensorTrain<T>, b: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    let _span = tracing::trace_span!("add", ndims = a.ndims()).entered();
    check_same_modes(a, b, "add")?;
    let plan = resolve_batch(a, b)?;
    let d = a.ndims();

    let parts = try_map_indexed(d, |k| {
        let (da, db) = (item_dims(a, k), item_dims(b, k));
        // Offsets of b's block; boundary ranks stay 1
        let left_b = if k == 0 { 0 } else { da.left };
        let right_b = if k == d - 1 { 0 } else { da.right };
        let dims = CoreDims {
            batch: plan.size,
            left: if k == 0 { 1 } else { da.left + db.left },
            rows: da.rows,
            cols: da.cols,
            right: if k == d - 1 { 1 } else { da.right + db.right },
        };
        let mut data = vec![T::zero(); dims.batch * dims.item_len()];
        for item in 0..plan.size {
            place_block(&mut data, &dims, item, core_item(a, k, item), &da, 0, 0);
            place_block(&mut data, &dims, item, core_item(b, k, item), &db, left_b, right_b);
        }
        Ok((dims, data))
    })?;

    let ranks = (0..=d)
        .map(|k| {
            if k == 0 || k == d {
                Dim::Known(1)
            } else {
                a.declared_ranks()[k].sum(b.declared_ranks()[k])
            }
        })
        .collect();
    TensorTrain::assemble(a.kind(), plan.declared, ranks, parts)
}

/// Accumulate one operand's item into `out` at rank offsets `(left, right)`
fn place_block<T: TTScalar>(
    out: &mut [T],
    dims: &CoreDims,
    item: usize,
    src: &[T],
    src_dims: &CoreDims,
    left: usize,
    right: usize,
) {
    for l in 0..src_dims.left {
        for i in 0..src_dims.rows {
            for j in 0..src_dims.cols {
                let from = src_dims.offset(0, l, i, j, 0);
                let to = dims.offset(item, left + l, i, j, right);
                for r in 0..src_dims.right {
                    out[to + r] = out[to + r] + src[from + r];
                }
            }
        }
    }
}

/// Elementwise (Hadamard) product of two tensor trains of the same kind and
/// mode shape.
///
/// Ranks of the result are the products of the operand ranks.
///
/// # Errors
///
/// - `ShapeMismatch` if kinds or mode shapes differ
/// - `BatchSizeMismatch` if batch sizes differ and neither broadcasts
pub fn multiply<T: TTScalar>(a: &TensorTrain<T>, b: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    let _span = tracing::trace_span!("multiply", ndims = a.ndims()).entered();
    check_same_modes(a, b, "multiply")?;
    let plan = resolve_batch(a, b)?;
    let d = a.ndims();

    let parts = try_map_indexed(d, |k| Ok(kronecker_core(a, b, k, &plan)))?;
    let ranks = a
        .declared_ranks()
        .iter()
        .zip(b.declared_ranks())
        .map(|(&ra, &rb)| ra.product(rb))
        .collect();
    TensorTrain::assemble(a.kind(), plan.declared, ranks, parts)
}

fn kronecker_core<T: TTScalar>(
    a: &TensorTrain<T>,
    b: &TensorTrain<T>,
    k: usize,
    plan: &BatchPlan,
) -> (CoreDims, Vec<T>) {
    let (da, db) = (item_dims(a, k), item_dims(b, k));
    let dims = CoreDims {
        batch: plan.size,
        left: da.left * db.left,
        rows: da.rows,
        cols: da.cols,
        right: da.right * db.right,
    };
    let mut data = vec![T::zero(); dims.batch * dims.item_len()];
    for item in 0..plan.size {
        let (ca, cb) = (core_item(a, k, item), core_item(b, k, item));
        for la in 0..da.left {
            for lb in 0..db.left {
                for i in 0..da.rows {
                    for j in 0..da.cols {
                        for ra in 0..da.right {
                            let x = ca[da.offset(0, la, i, j, ra)];
                            let to = dims.offset(item, la * db.left + lb, i, j, ra * db.right);
                            let from = db.offset(0, lb, i, j, 0);
                            for rb in 0..db.right {
                                data[to + rb] = x * cb[from + rb];
                            }
                        }
                    }
                }
            }
        }
    }
    (dims, data)
}

/// Multiply by a scalar. The factor is folded into the first core only.
pub fn multiply_by_scalar<T: TTScalar>(a: &TensorTrain<T>, factor: T) -> Result<TensorTrain<T>> {
    let parts = (0..a.ndims())
        .map(|k| {
            let dims = a.dims(k);
            let data = if k == 0 {
                a.core(k).as_slice().iter().map(|&x| x * factor).collect()
            } else {
                a.core(k).as_slice().to_vec()
            };
            (dims, data)
        })
        .collect();
    TensorTrain::assemble(
        a.kind(),
        a.declared_batch_size(),
        a.declared_ranks().to_vec(),
        parts,
    )
}

/// `-a`
pub fn negate<T: TTScalar>(a: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    multiply_by_scalar(a, -T::one())
}

/// `a - b`, with the same rank growth and errors as [`add`]
pub fn subtract<T: TTScalar>(a: &TensorTrain<T>, b: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    add(a, &negate(b)?)
}
