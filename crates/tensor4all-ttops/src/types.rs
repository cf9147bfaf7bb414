//! Core types for tensor train algebra

/// A statically declared extent: a link rank or a batch size.
///
/// `Deferred` means the value was not declared when the tensor train was
/// built and has to be read from the core arrays when an operation needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Declared value
    Known(usize),
    /// Not declared; resolved against the arrays
    Deferred,
}

/// Declared rank of one link
pub type Rank = Dim;

impl Dim {
    /// The declared value, if any
    pub fn known(self) -> Option<usize> {
        match self {
            Dim::Known(v) => Some(v),
            Dim::Deferred => None,
        }
    }

    /// Whether the value is declared
    pub fn is_known(self) -> bool {
        matches!(self, Dim::Known(_))
    }

    /// The declared value, or `actual` when deferred
    pub fn resolve(self, actual: usize) -> usize {
        self.known().unwrap_or(actual)
    }

    /// Declared sum of two extents (deferred if either is)
    pub fn sum(self, other: Dim) -> Dim {
        match (self, other) {
            (Dim::Known(a), Dim::Known(b)) => Dim::Known(a + b),
            _ => Dim::Deferred,
        }
    }

    /// Declared product of two extents (deferred if either is)
    pub fn product(self, other: Dim) -> Dim {
        match (self, other) {
            (Dim::Known(a), Dim::Known(b)) => Dim::Known(a * b),
            _ => Dim::Deferred,
        }
    }
}

impl From<usize> for Dim {
    fn from(v: usize) -> Self {
        Dim::Known(v)
    }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dim::Known(v) => write!(f, "{v}"),
            Dim::Deferred => write!(f, "?"),
        }
    }
}

/// What a tensor train represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TTKind {
    /// Cores `(left, mode, right)`
    Tensor,
    /// Cores `(left, row_mode, col_mode, right)`
    Matrix,
}

impl TTKind {
    /// Number of axes of a non-batch core
    pub fn core_ndim(self) -> usize {
        match self {
            TTKind::Tensor => 3,
            TTKind::Matrix => 4,
        }
    }
}

/// Uniform view of a core's extents.
///
/// Tensor cores are seen with `cols == 1` and non-batch cores with
/// `batch == 1`; both views share the row-major layout of the stored
/// array, so no data is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreDims {
    /// Batch extent
    pub batch: usize,
    /// Left rank
    pub left: usize,
    /// Row mode size (the mode size for tensors)
    pub rows: usize,
    /// Column mode size (1 for tensors)
    pub cols: usize,
    /// Right rank
    pub right: usize,
}

impl CoreDims {
    /// Elements in one batch item
    pub fn item_len(&self) -> usize {
        self.left * self.rows * self.cols * self.right
    }

    /// Combined mode extent `rows * cols`
    pub fn modes(&self) -> usize {
        self.rows * self.cols
    }

    /// Flat offset of `(b, l, i, j, r)`
    #[inline]
    pub fn offset(&self, b: usize, l: usize, i: usize, j: usize, r: usize) -> usize {
        (((b * self.left + l) * self.rows + i) * self.cols + j) * self.right + r
    }
}

/// Result of a reduction: one value, or one value per batch item
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction<T> {
    /// Both operands were single tensor trains
    Scalar(T),
    /// At least one operand was a batch
    Batch(Vec<T>),
}

impl<T: Copy> Reduction<T> {
    /// The scalar value, if this is not a batch result
    pub fn scalar(&self) -> Option<T> {
        match self {
            Reduction::Scalar(v) => Some(*v),
            Reduction::Batch(_) => None,
        }
    }

    /// All values as a slice (a scalar result has length one)
    pub fn values(&self) -> &[T] {
        match self {
            Reduction::Scalar(v) => std::slice::from_ref(v),
            Reduction::Batch(v) => v,
        }
    }

    /// Apply `f` to every value
    pub fn map<U, F: Fn(T) -> U>(self, f: F) -> Reduction<U> {
        match self {
            Reduction::Scalar(v) => Reduction::Scalar(f(v)),
            Reduction::Batch(v) => Reduction::Batch(v.into_iter().map(f).collect()),
        }
    }

    pub(crate) fn from_values(values: Vec<T>, batched: bool) -> Self {
        if batched {
            Reduction::Batch(values)
        } else {
            Reduction::Scalar(values[0])
        }
    }
}
