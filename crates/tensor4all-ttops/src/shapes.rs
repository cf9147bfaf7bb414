//! Shape, rank and batch-size inference
//!
//! Every query comes in two flavours: the `static_*` functions report what
//! was declared (possibly [`Dim::Deferred`]), the plain ones resolve
//! deferred values against the core arrays.
//!
//! Compatibility checks between two operands follow the same split. When
//! both values are declared the check runs on the declarations before any
//! arithmetic. Otherwise it runs on the arrays, and the result declares only
//! what can be derived without looking at them.

use crate::error::{Result, TensorTrainError};
use crate::tensortrain::TensorTrain;
use crate::types::{Dim, TTKind};

/// Mode sizes: one row for a TT-tensor, `[rows, cols]` for a TT-matrix
pub fn raw_shape<T: Copy>(tt: &TensorTrain<T>) -> Vec<Vec<usize>> {
    let d = tt.ndims();
    let rows = (0..d).map(|k| tt.dims(k).rows).collect();
    match tt.kind() {
        TTKind::Tensor => vec![rows],
        TTKind::Matrix => vec![rows, (0..d).map(|k| tt.dims(k).cols).collect()],
    }
}

/// Shape of the dense object `full` produces, batch axis first
pub fn shape<T: Copy>(tt: &TensorTrain<T>) -> Vec<usize> {
    let mut shape = Vec::with_capacity(tt.ndims() + 1);
    if let Some(b) = batch_size(tt) {
        shape.push(b);
    }
    let raw = raw_shape(tt);
    match tt.kind() {
        TTKind::Tensor => shape.extend_from_slice(&raw[0]),
        TTKind::Matrix => {
            shape.push(raw[0].iter().product());
            shape.push(raw[1].iter().product());
        }
    }
    shape
}

/// Declared ranks
pub fn static_tt_ranks<T: Copy>(tt: &TensorTrain<T>) -> Vec<Dim> {
    tt.declared_ranks().to_vec()
}

/// Ranks, declared where available and read from the cores otherwise
pub fn tt_ranks<T: Copy>(tt: &TensorTrain<T>) -> Vec<usize> {
    let d = tt.ndims();
    tt.declared_ranks()
        .iter()
        .enumerate()
        .map(|(site, rank)| {
            let actual = if site < d {
                tt.dims(site).left
            } else {
                tt.dims(d - 1).right
            };
            rank.resolve(actual)
        })
        .collect()
}

/// Declared batch size; `None` for a single tensor train
pub fn static_batch_size<T: Copy>(tt: &TensorTrain<T>) -> Option<Dim> {
    tt.declared_batch_size()
}

/// Batch size, read from the cores when not declared; `None` for a single
/// tensor train
pub fn batch_size<T: Copy>(tt: &TensorTrain<T>) -> Option<usize> {
    tt.declared_batch_size()
        .map(|declared| declared.resolve(tt.dims(0).batch))
}

/// A batch of size 1 holding `tt` (a batch is returned unchanged)
pub fn expand_batch_dim<T: Copy>(tt: &TensorTrain<T>) -> Result<TensorTrain<T>> {
    tt.to_batch()
}

/// Whether broadcasting between the batch sizes of `a` and `b` can work,
/// judged from declarations only. Deferred sizes count as possible.
pub fn is_batch_broadcasting_possible<T: Copy, U: Copy>(
    a: &TensorTrain<T>,
    b: &TensorTrain<U>,
) -> bool {
    match (a.declared_batch_size(), b.declared_batch_size()) {
        (Some(Dim::Known(x)), Some(Dim::Known(y))) => x == y || x == 1 || y == 1,
        _ => true,
    }
}

/// Batch layout of a binary operation's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchPlan {
    /// Declared batch size of the result; `None` when neither operand is a batch
    pub declared: Option<Dim>,
    /// Number of batch items to compute (1 when neither operand is a batch)
    pub size: usize,
}

impl BatchPlan {
    pub fn is_batch(&self) -> bool {
        self.declared.is_some()
    }
}

/// Batch item of an operand with `extent` items feeding result item `b`
#[inline]
pub(crate) fn broadcast_item(extent: usize, b: usize) -> usize {
    if extent == 1 {
        0
    } else {
        b
    }
}

fn broadcast(left: usize, right: usize) -> Result<usize> {
    if left == right || right == 1 {
        Ok(left)
    } else if left == 1 {
        Ok(right)
    } else {
        Err(TensorTrainError::BatchSizeMismatch { left, right })
    }
}

/// Reconcile the batch sizes of two operands
pub(crate) fn resolve_batch<T: Copy, U: Copy>(
    a: &TensorTrain<T>,
    b: &TensorTrain<U>,
) -> Result<BatchPlan> {
    resolve_batch_all(&[
        (a.declared_batch_size(), a.dims(0).batch),
        (b.declared_batch_size(), b.dims(0).batch),
    ])
}

/// Reconcile the batch sizes of any number of operands, given as
/// `(declared, actual)` pairs
pub(crate) fn resolve_batch_all(operands: &[(Option<Dim>, usize)]) -> Result<BatchPlan> {
    let batches: Vec<(Dim, usize)> = operands
        .iter()
        .filter_map(|&(declared, actual)| declared.map(|d| (d, actual)))
        .collect();
    if batches.is_empty() {
        return Ok(BatchPlan {
            declared: None,
            size: 1,
        });
    }

    if batches.iter().all(|(d, _)| d.is_known()) {
        // Static path: declarations alone decide.
        let mut size = 1;
        for &(declared, _) in &batches {
            size = broadcast(size, declared.resolve(0))?;
        }
        return Ok(BatchPlan {
            declared: Some(Dim::Known(size)),
            size,
        });
    }

    // Deferred path: only a declared size of 1 broadcasts, every other
    // operand must match exactly once the arrays are read.
    let mut exact: Option<usize> = None;
    for &(declared, actual) in &batches {
        if declared == Dim::Known(1) {
            continue;
        }
        match exact {
            Some(size) if size != actual => {
                return Err(TensorTrainError::BatchSizeMismatch {
                    left: size,
                    right: actual,
                })
            }
            _ => exact = Some(actual),
        }
    }
    let size = exact.unwrap_or(1);
    let declared = batches
        .iter()
        .find_map(|(d, _)| d.known().filter(|&v| v != 1))
        .map_or(Dim::Deferred, Dim::Known);
    tracing::debug!(size, declared = %declared, "resolved deferred batch size");
    Ok(BatchPlan {
        declared: Some(declared),
        size,
    })
}

/// Check that two operands are of the same kind with equal mode sizes
pub(crate) fn check_same_modes<T: Copy, U: Copy>(
    a: &TensorTrain<T>,
    b: &TensorTrain<U>,
    op: &str,
) -> Result<()> {
    if a.kind() != b.kind() {
        return Err(TensorTrainError::shape(format!(
            "{op}: cannot combine a TT-{:?} with a TT-{:?}",
            a.kind(),
            b.kind()
        )));
    }
    let (sa, sb) = (raw_shape(a), raw_shape(b));
    if sa != sb {
        return Err(TensorTrainError::shape(format!(
            "{op}: mode shapes {sa:?} and {sb:?} differ"
        )));
    }
    Ok(())
}
