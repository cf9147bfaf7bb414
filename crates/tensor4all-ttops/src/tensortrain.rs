//! TensorTrain container
//!
//! A [`TensorTrain`] is an ordered chain of cores together with the ranks
//! and batch size that were *declared* when it was built. Declarations are
//! either [`Dim::Known`] (checked against the arrays here, once) or
//! [`Dim::Deferred`] (left for operations to read from the arrays).

use crate::dense::DenseTensor;
use crate::error::{Result, TensorTrainError};
use crate::types::{CoreDims, Dim, TTKind};

/// Tensor train representation of a tensor, a matrix, or a batch of either.
///
/// T[i1, i2, ..., iL] = A1[i1] * A2[i2] * ... * AL[iL]
///
/// Core layouts:
/// - tensor: `(left, mode, right)`
/// - matrix: `(left, row_mode, col_mode, right)`
/// - batch: the same with a leading batch axis
#[derive(Debug, Clone, PartialEq)]
pub struct TensorTrain<T> {
    cores: Vec<DenseTensor<T>>,
    ranks: Vec<Dim>,
    batch: Option<Dim>,
    kind: TTKind,
}

impl<T: Copy> TensorTrain<T> {
    /// Create a tensor train from cores; ranks are declared from the arrays.
    ///
    /// Cores with 3 axes make a TT-tensor, cores with 4 axes a TT-matrix.
    pub fn new(cores: Vec<DenseTensor<T>>) -> Result<Self> {
        Self::from_parts(cores, None, None)
    }

    /// Create a batch of tensor trains; ranks and batch size are declared
    /// from the arrays.
    pub fn new_batch(cores: Vec<DenseTensor<T>>) -> Result<Self> {
        let batch = cores
            .first()
            .and_then(|c| c.shape().first().copied())
            .ok_or(TensorTrainError::Empty)?;
        Self::from_parts(cores, None, Some(Dim::Known(batch)))
    }

    /// Create a tensor train with explicit declarations.
    ///
    /// `ranks` has one entry per link including both boundaries; `None`
    /// declares every rank from the arrays. `batch` is `None` for a single
    /// tensor train and `Some(declared)` for a batch.
    pub fn from_parts(
        cores: Vec<DenseTensor<T>>,
        ranks: Option<Vec<Dim>>,
        batch: Option<Dim>,
    ) -> Result<Self> {
        let first = cores.first().ok_or(TensorTrainError::Empty)?;
        let offset = usize::from(batch.is_some());
        let kind = match first.ndim().checked_sub(offset) {
            Some(3) => TTKind::Tensor,
            Some(4) => TTKind::Matrix,
            _ => {
                return Err(TensorTrainError::shape(format!(
                    "core with shape {:?} is neither a tensor nor a matrix core{}",
                    first.shape(),
                    if batch.is_some() { " (batch)" } else { "" }
                )))
            }
        };

        for (k, core) in cores.iter().enumerate() {
            if core.ndim() != first.ndim() {
                return Err(TensorTrainError::shape(format!(
                    "core {k} has {} axes, core 0 has {}",
                    core.ndim(),
                    first.ndim()
                )));
            }
            if batch.is_some() && core.dim(0) != first.dim(0) {
                return Err(TensorTrainError::BatchSizeMismatch {
                    left: first.dim(0),
                    right: core.dim(0),
                });
            }
        }

        let d = cores.len();
        let left = |k: usize| cores[k].dim(offset);
        let right = |k: usize| cores[k].dim(cores[k].ndim() - 1);
        let mut actual = Vec::with_capacity(d + 1);
        actual.push(left(0));
        for k in 0..d {
            if k + 1 < d && right(k) != left(k + 1) {
                return Err(TensorTrainError::RankMismatch {
                    site: k + 1,
                    expected: right(k),
                    got: left(k + 1),
                });
            }
            actual.push(right(k));
        }
        if actual[0] != 1 {
            return Err(TensorTrainError::RankMismatch {
                site: 0,
                expected: 1,
                got: actual[0],
            });
        }
        if actual[d] != 1 {
            return Err(TensorTrainError::RankMismatch {
                site: d,
                expected: 1,
                got: actual[d],
            });
        }

        let mut ranks = match ranks {
            Some(r) if r.len() != d + 1 => {
                return Err(TensorTrainError::InvalidOperation {
                    message: format!("{} ranks declared for {d} cores", r.len()),
                })
            }
            Some(r) => r,
            None => actual.iter().map(|&r| Dim::Known(r)).collect(),
        };
        for (site, (declared, &got)) in ranks.iter().zip(&actual).enumerate() {
            if let Dim::Known(expected) = *declared {
                if expected != got {
                    return Err(TensorTrainError::RankMismatch {
                        site,
                        expected,
                        got,
                    });
                }
            }
        }
        ranks[0] = Dim::Known(1);
        ranks[d] = Dim::Known(1);

        if let Some(Dim::Known(declared)) = batch {
            if declared != first.dim(0) {
                return Err(TensorTrainError::BatchSizeMismatch {
                    left: declared,
                    right: first.dim(0),
                });
            }
        }

        Ok(Self {
            cores,
            ranks,
            batch,
            kind,
        })
    }

    /// Assemble a result from per-core flat buffers laid out as
    /// `(batch, left, rows, cols, right)`.
    pub(crate) fn assemble(
        kind: TTKind,
        batch: Option<Dim>,
        ranks: Vec<Dim>,
        parts: Vec<(CoreDims, Vec<T>)>,
    ) -> Result<Self> {
        let cores = parts
            .into_iter()
            .map(|(dims, data)| {
                let mut shape = Vec::with_capacity(5);
                if batch.is_some() {
                    shape.push(dims.batch);
                }
                shape.push(dims.left);
                shape.push(dims.rows);
                if kind == TTKind::Matrix {
                    shape.push(dims.cols);
                }
                shape.push(dims.right);
                DenseTensor::from_vec(data, &shape)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            cores,
            ranks,
            batch,
            kind,
        })
    }

    /// Forget every declared inner rank, as if built from arrays of
    /// unknown shape.
    pub fn with_deferred_ranks(mut self) -> Self {
        let d = self.cores.len();
        for rank in &mut self.ranks[1..d] {
            *rank = Dim::Deferred;
        }
        self
    }

    /// Forget the declared batch size (no effect on a single tensor train)
    pub fn with_deferred_batch_size(mut self) -> Self {
        if self.batch.is_some() {
            self.batch = Some(Dim::Deferred);
        }
        self
    }

    /// Number of cores
    pub fn ndims(&self) -> usize {
        self.cores.len()
    }

    /// All cores
    pub fn cores(&self) -> &[DenseTensor<T>] {
        &self.cores
    }

    /// Core at position `k`
    pub fn core(&self, k: usize) -> &DenseTensor<T> {
        &self.cores[k]
    }

    /// Consume into the cores
    pub fn into_cores(self) -> Vec<DenseTensor<T>> {
        self.cores
    }

    /// Tensor or matrix
    pub fn kind(&self) -> TTKind {
        self.kind
    }

    /// Whether this is a batch
    pub fn is_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Whether this represents a matrix
    pub fn is_matrix(&self) -> bool {
        self.kind == TTKind::Matrix
    }

    /// Whether this is a TT-matrix with every column mode equal to 1
    pub fn is_vector(&self) -> bool {
        self.is_matrix() && (0..self.ndims()).all(|k| self.dims(k).cols == 1)
    }

    /// Declared ranks, `ndims() + 1` entries
    pub fn declared_ranks(&self) -> &[Dim] {
        &self.ranks
    }

    /// Declared batch size; `None` for a single tensor train
    pub fn declared_batch_size(&self) -> Option<Dim> {
        self.batch
    }

    /// Name of the element type
    pub fn dtype_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// Uniform extents of core `k`
    pub(crate) fn dims(&self, k: usize) -> CoreDims {
        let shape = self.cores[k].shape();
        let (batch, rest) = if self.batch.is_some() {
            (shape[0], &shape[1..])
        } else {
            (1, shape)
        };
        match (self.kind, rest) {
            (TTKind::Matrix, &[left, rows, cols, right]) => CoreDims {
                batch,
                left,
                rows,
                cols,
                right,
            },
            (_, rest) => CoreDims {
                batch,
                left: rest[0],
                rows: rest[1],
                cols: 1,
                right: rest[rest.len() - 1],
            },
        }
    }

    /// Single tensor train at position `index` of a batch
    pub fn batch_item(&self, index: usize) -> Result<Self> {
        if !self.is_batch() {
            return Err(TensorTrainError::unsupported(
                "batch_item requires a batch of tensor trains",
            ));
        }
        let size = self.cores[0].dim(0);
        if index >= size {
            return Err(TensorTrainError::IndexOutOfBounds {
                site: 0,
                index,
                max: size,
            });
        }
        let parts = (0..self.ndims())
            .map(|k| {
                let dims = self.dims(k);
                let len = dims.item_len();
                let data = self.cores[k].as_slice()[index * len..(index + 1) * len].to_vec();
                (CoreDims { batch: 1, ..dims }, data)
            })
            .collect();
        Self::assemble(self.kind, None, self.ranks.clone(), parts)
    }

    /// A batch of size 1 holding this tensor train (a batch is returned as is)
    pub fn to_batch(&self) -> Result<Self> {
        if self.is_batch() {
            return Ok(self.clone());
        }
        self.repeat_batch(1)
    }

    /// A batch holding `times` copies of a single tensor train or of a
    /// batch of size 1
    pub fn repeat_batch(&self, times: usize) -> Result<Self> {
        if self.is_batch() && self.cores[0].dim(0) != 1 {
            return Err(TensorTrainError::BatchSizeMismatch {
                left: self.cores[0].dim(0),
                right: 1,
            });
        }
        let parts = (0..self.ndims())
            .map(|k| {
                let dims = self.dims(k);
                let item = self.cores[k].as_slice();
                let mut data = Vec::with_capacity(item.len() * times);
                for _ in 0..times {
                    data.extend_from_slice(item);
                }
                (CoreDims { batch: times, ..dims }, data)
            })
            .collect();
        Self::assemble(self.kind, Some(Dim::Known(times)), self.ranks.clone(), parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(shape: &[usize]) -> DenseTensor<f64> {
        let len: usize = shape.iter().product();
        DenseTensor::from_vec((0..len).map(|x| x as f64).collect(), shape).unwrap()
    }

    #[test]
    fn test_new_tensor_and_matrix() {
        let tt = TensorTrain::new(vec![core(&[1, 2, 3]), core(&[3, 4, 1])]).unwrap();
        assert_eq!(tt.ndims(), 2);
        assert_eq!(tt.kind(), TTKind::Tensor);
        assert!(!tt.is_batch());
        assert_eq!(tt.declared_ranks(), &[Dim::Known(1), Dim::Known(3), Dim::Known(1)]);

        let mat = TensorTrain::new(vec![core(&[1, 2, 1, 2]), core(&[2, 3, 1, 1])]).unwrap();
        assert!(mat.is_matrix());
        assert!(mat.is_vector());
        assert_eq!(mat.dims(1).rows, 3);
    }

    #[test]
    fn test_new_rejects_broken_chain() {
        let err = TensorTrain::new(vec![core(&[1, 2, 3]), core(&[2, 4, 1])]).unwrap_err();
        assert_eq!(
            err,
            TensorTrainError::RankMismatch {
                site: 1,
                expected: 3,
                got: 2
            }
        );
        assert!(matches!(
            TensorTrain::new(vec![core(&[2, 2, 1])]),
            Err(TensorTrainError::RankMismatch { site: 0, .. })
        ));
        assert!(matches!(
            TensorTrain::<f64>::new(vec![]),
            Err(TensorTrainError::Empty)
        ));
        assert!(TensorTrain::new(vec![core(&[1, 2, 1, 2]), core(&[2, 3, 1])]).is_err());
    }

    #[test]
    fn test_declared_ranks_are_checked() {
        let cores = vec![core(&[1, 2, 3]), core(&[3, 4, 1])];
        let declared = vec![Dim::Known(1), Dim::Known(2), Dim::Known(1)];
        assert!(matches!(
            TensorTrain::from_parts(cores.clone(), Some(declared), None),
            Err(TensorTrainError::RankMismatch { site: 1, expected: 2, got: 3 })
        ));
        let deferred = vec![Dim::Deferred, Dim::Deferred, Dim::Deferred];
        let tt = TensorTrain::from_parts(cores, Some(deferred), None).unwrap();
        assert_eq!(tt.declared_ranks(), &[Dim::Known(1), Dim::Deferred, Dim::Known(1)]);
    }

    #[test]
    fn test_batch_construction_and_items() {
        let tt = TensorTrain::new_batch(vec![core(&[2, 1, 3, 2]), core(&[2, 2, 3, 1])]).unwrap();
        assert!(tt.is_batch());
        assert_eq!(tt.kind(), TTKind::Tensor);
        assert_eq!(tt.declared_batch_size(), Some(Dim::Known(2)));

        let item = tt.batch_item(1).unwrap();
        assert!(!item.is_batch());
        assert_eq!(item.core(0).as_slice(), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert!(tt.batch_item(2).is_err());

        let deferred = tt.clone().with_deferred_batch_size();
        assert_eq!(deferred.declared_batch_size(), Some(Dim::Deferred));

        assert!(matches!(
            TensorTrain::from_parts(
                vec![core(&[2, 1, 3, 2]), core(&[3, 2, 3, 1])],
                None,
                Some(Dim::Deferred)
            ),
            Err(TensorTrainError::BatchSizeMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_repeat_batch() {
        let tt = TensorTrain::new(vec![core(&[1, 2, 2]), core(&[2, 2, 1])]).unwrap();
        let rep = tt.repeat_batch(3).unwrap();
        assert_eq!(rep.core(0).shape(), &[3, 1, 2, 2]);
        assert_eq!(rep.batch_item(2).unwrap(), tt);
        assert_eq!(tt.to_batch().unwrap().declared_batch_size(), Some(Dim::Known(1)));
        assert!(rep.repeat_batch(2).is_err());
    }

    #[test]
    fn test_with_deferred_ranks_keeps_boundaries() {
        let tt = TensorTrain::new(vec![core(&[1, 2, 2]), core(&[2, 2, 2]), core(&[2, 2, 1])])
            .unwrap()
            .with_deferred_ranks();
        assert_eq!(
            tt.declared_ranks(),
            &[Dim::Known(1), Dim::Deferred, Dim::Deferred, Dim::Known(1)]
        );
    }
}
