#![warn(missing_docs)]
//! Tensor train algebra
//!
//! This crate implements arithmetic directly on tensors and matrices stored
//! in tensor train (TT) format, without reconstructing them:
//! - `TensorTrain`: TT-tensors, TT-matrices and batches of either, with
//!   ranks and batch sizes that are declared or deferred to the arrays
//! - Reconstruction (`full`) and element lookup (`gather_nd`)
//! - Sums, elementwise and matrix products, transposition
//! - Inner products, Frobenius norms and bilinear forms
//! - Core norm balancing and element type conversion
//!
//! # Example
//!
//! ```
//! use tensor4all_ttops::{ops, DenseTensor, TensorTrain};
//!
//! let a = TensorTrain::new(vec![
//!     DenseTensor::from_vec(vec![1.0, 2.0], &[1, 2, 1])?,
//!     DenseTensor::from_vec(vec![3.0, 4.0, 5.0], &[1, 3, 1])?,
//! ])?;
//!
//! let sum = ops::add(&a, &a)?;
//! let dense = ops::full(&sum)?;
//! assert_eq!(dense.shape(), &[2, 3]);
//! assert_eq!(dense.get(&[1, 2]), Some(&20.0));
//!
//! let inner = ops::flat_inner(&a, &sum)?;
//! assert_eq!(inner.scalar(), Some(500.0));
//! # Ok::<(), tensor4all_ttops::TensorTrainError>(())
//! ```

pub mod dense;
pub mod error;
pub mod linalg;
pub mod ops;
pub mod parallel;
pub mod shapes;
pub mod sparse;
pub mod tensortrain;
pub mod traits;
pub mod types;

// Re-export main types
pub use dense::DenseTensor;
pub use error::{Result, TensorTrainError};
pub use ops::{CastPolicy, DenseFallback, MatmulOptions, Operand, Value};
pub use sparse::SparseTensor;
pub use tensortrain::TensorTrain;
pub use traits::TTScalar;
pub use types::{CoreDims, Dim, Rank, Reduction, TTKind};
