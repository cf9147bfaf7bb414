//! Error types for tensor train algebra

use thiserror::Error;

/// Result type for tensor train operations
pub type Result<T> = std::result::Result<T, TensorTrainError>;

/// Errors that can occur during tensor train operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorTrainError {
    /// Mode shapes, core counts, kinds or contracted axes disagree
    #[error("Shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// Adjacent cores do not agree on a link rank, or a declared rank
    /// disagrees with the array
    #[error("Rank mismatch at link {site}: expected {expected}, got {got}")]
    RankMismatch {
        /// Link position (0 is the left boundary)
        site: usize,
        /// The expected rank
        expected: usize,
        /// The rank found
        got: usize,
    },

    /// Two batches have different sizes and neither is 1
    #[error("Batch size mismatch: {left} vs {right}")]
    BatchSizeMismatch {
        /// Batch size of the left operand
        left: usize,
        /// Batch size of the right operand
        right: usize,
    },

    /// Invalid index provided
    #[error("Index out of bounds: index {index} at site {site} (max: {max})")]
    IndexOutOfBounds {
        /// The site index where the error occurred (batch axis counts as a site)
        site: usize,
        /// The invalid index value
        index: usize,
        /// The exclusive upper bound
        max: usize,
    },

    /// Length mismatch in index set
    #[error("Index set length mismatch: expected {expected}, got {got}")]
    IndexLengthMismatch {
        /// The expected length
        expected: usize,
        /// The actual length provided
        got: usize,
    },

    /// A runtime index array contained a negative entry
    #[error("Negative index {value} at position {position}")]
    NegativeIndex {
        /// Flat position of the offending entry
        position: usize,
        /// The offending value
        value: i64,
    },

    /// The operands cannot be combined by the requested operation
    #[error("Unsupported operands: {message}")]
    UnsupportedOperands {
        /// Description of the operand combination
        message: String,
    },

    /// An exact cast met a value the target type cannot hold
    #[error("Cast rejected: element {index} of core {core} does not round-trip")]
    CastRejected {
        /// Core position
        core: usize,
        /// Flat element index inside the core
        index: usize,
    },

    /// Empty tensor train
    #[error("Tensor train is empty")]
    Empty,

    /// Invalid operation
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the invalid operation
        message: String,
    },
}

impl TensorTrainError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperands {
            message: message.into(),
        }
    }
}
