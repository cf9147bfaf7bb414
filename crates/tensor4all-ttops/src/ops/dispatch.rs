//! Operand dispatch
//!
//! Entry points taking loosely typed operands ([`Operand`]) and routing
//! them to the matching combinator. The routing tables are explicit match
//! arms; unsupported combinations are errors, never silent coercions.

use super::{arithmetic, contraction, matmul as mm};
use crate::dense::DenseTensor;
use crate::error::{Result, TensorTrainError};
use crate::sparse::SparseTensor;
use crate::tensortrain::TensorTrain;
use crate::traits::TTScalar;
use crate::types::Reduction;

/// An argument of a dispatched operation
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a, T> {
    /// A tensor train or a batch of them
    TT(&'a TensorTrain<T>),
    /// A scalar
    Scalar(T),
    /// A dense array
    Dense(&'a DenseTensor<T>),
    /// A sparse tensor
    Sparse(&'a SparseTensor<T>),
}

impl<T> Operand<'_, T> {
    fn describe(&self) -> &'static str {
        match self {
            Operand::TT(_) => "tensor train",
            Operand::Scalar(_) => "scalar",
            Operand::Dense(_) => "dense array",
            Operand::Sparse(_) => "sparse tensor",
        }
    }
}

impl<'a, T> From<&'a TensorTrain<T>> for Operand<'a, T> {
    fn from(tt: &'a TensorTrain<T>) -> Self {
        Operand::TT(tt)
    }
}

impl<'a, T> From<&'a DenseTensor<T>> for Operand<'a, T> {
    fn from(dense: &'a DenseTensor<T>) -> Self {
        Operand::Dense(dense)
    }
}

impl<'a, T> From<&'a SparseTensor<T>> for Operand<'a, T> {
    fn from(sparse: &'a SparseTensor<T>) -> Self {
        Operand::Sparse(sparse)
    }
}

/// Result of a dispatched product
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    /// Compressed result
    TT(TensorTrain<T>),
    /// Dense result of a dense-fallback product
    Dense(DenseTensor<T>),
}

impl<T> Value<T> {
    /// The tensor train, if the result is compressed
    pub fn into_tt(self) -> Option<TensorTrain<T>> {
        match self {
            Value::TT(tt) => Some(tt),
            Value::Dense(_) => None,
        }
    }

    /// The dense array, if the result is dense
    pub fn into_dense(self) -> Option<DenseTensor<T>> {
        match self {
            Value::TT(_) => None,
            Value::Dense(dense) => Some(dense),
        }
    }
}

/// Whether a product may reconstruct a TT operand to multiply it with a
/// dense one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DenseFallback {
    /// Reject TT x dense products
    #[default]
    Forbid,
    /// Reconstruct the TT operand and multiply densely
    Allow,
}

/// Options for [`matmul`]
#[derive(Debug, Clone, Default)]
pub struct MatmulOptions {
    /// Treatment of mixed TT / dense operands
    pub dense_fallback: DenseFallback,
}

fn unsupported<T>(op: &str, a: &Operand<'_, T>, b: &Operand<'_, T>) -> TensorTrainError {
    TensorTrainError::unsupported(format!(
        "{op} of a {} and a {}",
        a.describe(),
        b.describe()
    ))
}

/// Sum of two tensor trains
pub fn add<T: TTScalar>(a: Operand<'_, T>, b: Operand<'_, T>) -> Result<TensorTrain<T>> {
    match (a, b) {
        (Operand::TT(x), Operand::TT(y)) => arithmetic::add(x, y),
        _ => Err(unsupported("add", &a, &b)),
    }
}

/// Elementwise product of two tensor trains, or a tensor train scaled by a
/// scalar on either side
pub fn multiply<T: TTScalar>(a: Operand<'_, T>, b: Operand<'_, T>) -> Result<TensorTrain<T>> {
    match (a, b) {
        (Operand::TT(x), Operand::TT(y)) => arithmetic::multiply(x, y),
        (Operand::TT(x), Operand::Scalar(k)) | (Operand::Scalar(k), Operand::TT(x)) => {
            arithmetic::multiply_by_scalar(x, k)
        }
        _ => Err(unsupported("multiply", &a, &b)),
    }
}

/// Matrix product.
///
/// Two tensor trains give a compressed result. A tensor train and a dense
/// array give a dense result, but only when `options` allow the dense
/// fallback.
pub fn matmul<T: TTScalar>(
    a: Operand<'_, T>,
    b: Operand<'_, T>,
    options: &MatmulOptions,
) -> Result<Value<T>> {
    let fallback = options.dense_fallback == DenseFallback::Allow;
    match (a, b) {
        (Operand::TT(x), Operand::TT(y)) => mm::matmul(x, y).map(Value::TT),
        (Operand::TT(x), Operand::Dense(y)) if fallback => {
            mm::matmul_tt_dense(x, y).map(Value::Dense)
        }
        (Operand::Dense(x), Operand::TT(y)) if fallback => {
            mm::matmul_dense_tt(x, y).map(Value::Dense)
        }
        (Operand::TT(_), Operand::Dense(_)) | (Operand::Dense(_), Operand::TT(_)) => {
            Err(TensorTrainError::unsupported(
                "matmul of a tensor train and a dense array materializes the tensor train; \
                 set DenseFallback::Allow to permit it",
            ))
        }
        _ => Err(unsupported("matmul", &a, &b)),
    }
}

/// Inner product of the flattened operands; at least one must be a tensor
/// train, the other a tensor train, a sparse tensor or a dense array
pub fn flat_inner<T: TTScalar>(a: Operand<'_, T>, b: Operand<'_, T>) -> Result<Reduction<T>> {
    match (a, b) {
        (Operand::TT(x), Operand::TT(y)) => contraction::flat_inner(x, y),
        (Operand::TT(x), Operand::Sparse(s)) | (Operand::Sparse(s), Operand::TT(x)) => {
            contraction::tt_sparse_flat_inner(x, s)
        }
        (Operand::TT(x), Operand::Dense(d)) | (Operand::Dense(d), Operand::TT(x)) => {
            contraction::tt_dense_flat_inner(x, d)
        }
        _ => Err(unsupported("flat_inner", &a, &b)),
    }
}
