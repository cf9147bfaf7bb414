//! Algebra on tensor trains
//!
//! Every operation here works on the compressed cores directly. The only
//! functions that materialize dense data are [`full`] and the explicitly
//! named dense-fallback products in [`matmul`](self::matmul).
//!
//! Operations accept single tensor trains and batches alike. Batches are
//! combined item by item; a batch whose size is declared as 1 broadcasts
//! against any other batch size.

pub mod arithmetic;
pub mod cast;
pub mod contraction;
pub mod dispatch;
pub mod full;
pub mod gather;
pub mod matmul;
pub mod normalize;

pub use arithmetic::{add, multiply, multiply_by_scalar, negate, subtract};
pub use cast::{cast, CastPolicy};
pub use contraction::{
    bilinear_form, bilinear_form_two_mat, flat_inner, frobenius_norm, frobenius_norm_squared,
    quadratic_form, tt_dense_flat_inner, tt_sparse_flat_inner,
};
pub use dispatch::{DenseFallback, MatmulOptions, Operand, Value};
pub use full::full;
pub use gather::{gather_nd, gather_nd_array};
pub use matmul::{matmul, matmul_dense_tt, matmul_tt_dense, transpose};
pub use normalize::renormalize_tt_cores;

use crate::shapes::broadcast_item;
use crate::tensortrain::TensorTrain;
use crate::types::CoreDims;

/// Data of core `k` for result batch item `b`, honoring broadcasting
pub(crate) fn core_item<T: Copy>(tt: &TensorTrain<T>, k: usize, b: usize) -> &[T] {
    let dims = tt.dims(k);
    let item = broadcast_item(dims.batch, b);
    let len = dims.item_len();
    &tt.core(k).as_slice()[item * len..(item + 1) * len]
}

/// Extents of core `k` for a single batch item
pub(crate) fn item_dims<T: Copy>(tt: &TensorTrain<T>, k: usize) -> CoreDims {
    CoreDims {
        batch: 1,
        ..tt.dims(k)
    }
}
