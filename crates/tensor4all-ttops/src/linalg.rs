//! Small dense linear algebra on flat row-major buffers

use crate::traits::TTScalar;
use mdarray::{DSlice, DTensor};
use mdarray_linalg::qr::QR;
use mdarray_linalg_faer::Faer;
use num_complex::ComplexFloat;

/// Row-major product of an `m x k` and a `k x n` matrix
pub fn mat_mul<T: TTScalar>(a: &[T], m: usize, k: usize, b: &[T], n: usize) -> Vec<T> {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    let mut c = vec![T::zero(); m * n];
    for i in 0..m {
        let row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let aip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            for (cij, &bpj) in row.iter_mut().zip(b_row) {
                *cij = *cij + aip * bpj;
            }
        }
    }
    c
}

/// Triangular factor of a QR decomposition, computed by the faer backend.
///
/// For a row-major `m x n` matrix `A` returns `(R, k)` where `R` is the
/// row-major `k x n` upper-triangular factor, `k = min(m, n)`, and
/// `A^H A = R^H R`.
pub(crate) fn qr_r_factor<T>(a: &[T], m: usize, n: usize) -> (Vec<T>, usize)
where
    T: ComplexFloat
        + Default
        + faer_traits::ComplexField
        + From<<T as ComplexFloat>::Real>
        + 'static,
    <T as ComplexFloat>::Real: Into<f64>,
{
    debug_assert_eq!(a.len(), m * n);
    let k = m.min(n);
    if k == 0 {
        return (Vec::new(), 0);
    }

    let mut a_tensor = DTensor::<T, 2>::from_fn([m, n], |idx| a[idx[0] * n + idx[1]]);
    let a_slice: &mut DSlice<T, 2> = a_tensor.as_mut();
    let bd = Faer;
    let (_, r_full) = bd.qr(a_slice);

    // R is m x n; rows past k are zero
    let mut r = Vec::with_capacity(k * n);
    for i in 0..k {
        for j in 0..n {
            r.push(r_full[[i, j]]);
        }
    }
    (r, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    fn gram<T: TTScalar>(a: &[T], m: usize, n: usize) -> Vec<T> {
        let mut g = vec![T::zero(); n * n];
        for i in 0..n {
            for j in 0..n {
                for p in 0..m {
                    g[i * n + j] = g[i * n + j] + a[p * n + i].conj() * a[p * n + j];
                }
            }
        }
        g
    }

    #[test]
    fn test_mat_mul() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        // (2x3) * (3x2)
        assert_eq!(mat_mul(&a, 2, 3, &b, 2), vec![4.0, 5.0, 10.0, 11.0]);
    }

    #[test]
    fn test_mat_mul_propagates_non_finite_through_zero() {
        // 0 * inf + 1 * 2
        let c = mat_mul(&[0.0, 1.0], 1, 2, &[f64::INFINITY, 2.0], 1);
        assert!(c[0].is_nan());
        let c = mat_mul(&[0.0], 1, 1, &[f64::NAN], 1);
        assert!(c[0].is_nan());
    }

    #[test]
    fn test_qr_r_factor_preserves_gram_matrix() {
        let a = [2.0, -1.0, 0.5, 1.0, 3.0, 0.0, -2.0, 1.0, 4.0, 0.0, 0.0, 1.0];
        let (r, k) = qr_r_factor(&a, 4, 3);
        assert_eq!(k, 3);
        let ga = gram(&a, 4, 3);
        let gr = gram(&r, 3, 3);
        for (x, y) in ga.iter().zip(&gr) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
        // below-diagonal entries vanish
        for idx in [3, 6, 7] {
            assert_abs_diff_eq!(r[idx], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_qr_r_factor_wide_and_zero_columns() {
        let a = [0.0, 1.0, 2.0, 0.0, 3.0, 4.0];
        let (r, k) = qr_r_factor(&a, 2, 3);
        assert_eq!(k, 2);
        let ga = gram(&a, 2, 3);
        let gr = gram(&r, 2, 3);
        for (x, y) in ga.iter().zip(&gr) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_qr_r_factor_complex() {
        let a = [
            Complex64::new(1.0, 1.0),
            Complex64::new(0.0, 2.0),
            Complex64::new(-1.0, 0.5),
            Complex64::new(3.0, 0.0),
            Complex64::new(0.5, -0.5),
            Complex64::new(1.0, 1.0),
        ];
        let (r, _) = qr_r_factor(&a, 3, 2);
        let ga = gram(&a, 3, 2);
        let gr = gram(&r, 2, 2);
        for (x, y) in ga.iter().zip(&gr) {
            assert!((*x - *y).norm() < 1e-12);
        }
    }
}
