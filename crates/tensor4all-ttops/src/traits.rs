//! Scalar trait for tensor train elements

use crate::linalg::qr_r_factor;
use num_complex::{Complex32, Complex64};
use num_traits::{Float, One, Zero};

/// Scalar trait for tensor train elements
///
/// Implemented for `f32`, `f64`, `Complex32` and `Complex64`. Integer cores
/// can be stored in a [`TensorTrain`](crate::TensorTrain) but must be
/// [`cast`](crate::ops::cast) before any arithmetic.
pub trait TTScalar:
    Clone
    + Copy
    + Zero
    + One
    + PartialEq
    + std::fmt::Debug
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::Neg<Output = Self>
    + Default
    + Send
    + Sync
    + 'static
{
    /// Conjugate
    fn conj(self) -> Self;

    /// Absolute value squared
    fn abs_sq(self) -> f64;

    /// Absolute value as f64
    fn abs_val(self) -> f64 {
        self.abs_sq().sqrt()
    }

    /// Real part as f64
    fn re(self) -> f64;

    /// Create from f64 value
    fn from_f64(val: f64) -> Self;

    /// Upper-triangular QR factor of a row-major `m x n` matrix, as
    /// `(R, min(m, n))`
    fn r_factor(a: &[Self], m: usize, n: usize) -> (Vec<Self>, usize);
}

impl TTScalar for f64 {
    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn abs_sq(self) -> f64 {
        self * self
    }

    #[inline]
    fn abs_val(self) -> f64 {
        Float::abs(self)
    }

    #[inline]
    fn re(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        val
    }

    fn r_factor(a: &[Self], m: usize, n: usize) -> (Vec<Self>, usize) {
        qr_r_factor(a, m, n)
    }
}

impl TTScalar for f32 {
    #[inline]
    fn conj(self) -> Self {
        self
    }

    #[inline]
    fn abs_sq(self) -> f64 {
        (self as f64) * (self as f64)
    }

    #[inline]
    fn abs_val(self) -> f64 {
        Float::abs(self) as f64
    }

    #[inline]
    fn re(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        val as f32
    }

    fn r_factor(a: &[Self], m: usize, n: usize) -> (Vec<Self>, usize) {
        qr_r_factor(a, m, n)
    }
}

impl TTScalar for Complex64 {
    #[inline]
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }

    #[inline]
    fn abs_sq(self) -> f64 {
        self.norm_sqr()
    }

    #[inline]
    fn re(self) -> f64 {
        self.re
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        Complex64::new(val, 0.0)
    }

    fn r_factor(a: &[Self], m: usize, n: usize) -> (Vec<Self>, usize) {
        qr_r_factor(a, m, n)
    }
}

impl TTScalar for Complex32 {
    #[inline]
    fn conj(self) -> Self {
        Complex32::conj(&self)
    }

    #[inline]
    fn abs_sq(self) -> f64 {
        self.norm_sqr() as f64
    }

    #[inline]
    fn re(self) -> f64 {
        self.re as f64
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        Complex32::new(val as f32, 0.0)
    }

    fn r_factor(a: &[Self], m: usize, n: usize) -> (Vec<Self>, usize) {
        qr_r_factor(a, m, n)
    }
}
