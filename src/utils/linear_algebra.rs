/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Dense linear-algebra kernels on Faer matrices
//!
//! The matrices handled here are small (basis-set and projector
//! dimensions, typically < 200), so the solvers are written directly on
//! `faer::Mat` storage: LU with partial pivoting, Cholesky, a cyclic
//! Jacobi eigensolver and the Cholesky-reduced generalized symmetric
//! eigenproblem used by the dataset validation step.
//!
//! Singular matrices are reported as [`UtilsError::SingularMatrix`] so the
//! callers can distinguish a singular overlap matrix from a plain
//! accuracy failure.

use super::errors::{Result, UtilsError};
use faer::Mat;
use ndarray::Array2;

/// Convert from ndarray::Array2<f64> to faer::Mat<f64>
pub fn ndarray_to_faer(array: &Array2<f64>) -> Mat<f64> {
    let (rows, cols) = array.dim();
    let mut result = Mat::<f64>::zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            result[(i, j)] = array[(i, j)];
        }
    }
    result
}

/// Convert from faer::Mat<f64> to ndarray::Array2<f64>
pub fn faer_to_ndarray(matrix: &Mat<f64>) -> Array2<f64> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    let mut result = Array2::<f64>::zeros((rows, cols));
    for i in 0..rows {
        for j in 0..cols {
            result[(i, j)] = matrix[(i, j)];
        }
    }
    result
}

/// Solve A X = B by LU decomposition with partial pivoting
///
/// # Arguments
///
/// * `a` - The square coefficient matrix
/// * `b` - Right-hand sides, one per column
///
/// # Returns
///
/// The solution matrix X, or `SingularMatrix` if a pivot vanishes
pub fn lu_solve(a: &Mat<f64>, b: &Mat<f64>) -> Result<Mat<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return Err(UtilsError::Generic(format!(
            "Dimension mismatch in lu_solve: A is {}x{}, B has {} rows",
            n,
            a.ncols(),
            b.nrows()
        )));
    }

    let mut lu = a.clone();
    let mut x = b.clone();
    let nrhs = b.ncols();

    for k in 0..n {
        // Partial pivoting
        let mut max_row = k;
        let mut max_val = lu[(k, k)].abs();
        for i in (k + 1)..n {
            if lu[(i, k)].abs() > max_val {
                max_row = i;
                max_val = lu[(i, k)].abs();
            }
        }
        if max_val < 1e-300 {
            return Err(UtilsError::SingularMatrix(format!(
                "zero pivot in column {} of {}x{} system",
                k, n, n
            )));
        }
        if max_row != k {
            for j in 0..n {
                let t = lu[(k, j)];
                lu[(k, j)] = lu[(max_row, j)];
                lu[(max_row, j)] = t;
            }
            for j in 0..nrhs {
                let t = x[(k, j)];
                x[(k, j)] = x[(max_row, j)];
                x[(max_row, j)] = t;
            }
        }

        // Eliminate below the pivot, applying the same operations to B
        for i in (k + 1)..n {
            let factor = lu[(i, k)] / lu[(k, k)];
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                let v = lu[(k, j)];
                lu[(i, j)] -= factor * v;
            }
            for j in 0..nrhs {
                let v = x[(k, j)];
                x[(i, j)] -= factor * v;
            }
        }
    }

    // Back substitution
    for j in 0..nrhs {
        for i in (0..n).rev() {
            let mut sum = x[(i, j)];
            for k in (i + 1)..n {
                sum -= lu[(i, k)] * x[(k, j)];
            }
            x[(i, j)] = sum / lu[(i, i)];
        }
    }

    Ok(x)
}

/// Solve A x = b for a single right-hand side vector
pub fn solve_vec(a: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    let mut rhs = Mat::<f64>::zeros(n, 1);
    for i in 0..n {
        rhs[(i, 0)] = b[i];
    }
    let x = lu_solve(a, &rhs)?;
    Ok((0..n).map(|i| x[(i, 0)]).collect())
}

/// Invert a square matrix
pub fn invert(a: &Mat<f64>) -> Result<Mat<f64>> {
    let n = a.nrows();
    lu_solve(a, &Mat::<f64>::identity(n, n))
}

/// Cholesky factorization A = L Lᵀ of a symmetric positive-definite matrix
///
/// Returns the lower-triangular factor L, or `SingularMatrix` if the
/// matrix is not (numerically) positive definite.
pub fn cholesky_lower(a: &Mat<f64>) -> Result<Mat<f64>> {
    let n = a.nrows();
    let mut l = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(UtilsError::SingularMatrix(format!(
                        "matrix not positive definite at row {}",
                        i
                    )));
                }
                l[(i, j)] = sum.sqrt();
            } else {
                l[(i, j)] = sum / l[(j, j)];
            }
        }
    }
    Ok(l)
}

/// Eigenvalues and eigenvectors of a symmetric matrix by cyclic Jacobi
/// rotations
///
/// # Returns
///
/// Eigenvalues in ascending order and the matrix of eigenvectors (one per
/// column, matching the eigenvalue order).
pub fn jacobi_eigh(a: &Mat<f64>) -> Result<(Vec<f64>, Mat<f64>)> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(UtilsError::Generic(
            "jacobi_eigh requires a square matrix".to_string(),
        ));
    }
    let mut d = a.clone();
    let mut v = Mat::<f64>::identity(n, n);

    let mut scale = 0.0;
    for i in 0..n {
        for j in 0..n {
            scale += d[(i, j)] * d[(i, j)];
        }
    }

    for _sweep in 0..100 {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += d[(i, j)] * d[(i, j)];
            }
        }
        if off <= 1e-28 * scale.max(1e-300) {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = d[(p, q)];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let app = d[(p, p)];
                let aqq = d[(q, q)];
                let theta = 0.5 * (aqq - app) / apq;
                let t = if theta >= 0.0 {
                    1.0 / (theta + (1.0 + theta * theta).sqrt())
                } else {
                    1.0 / (theta - (1.0 + theta * theta).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                for k in 0..n {
                    let dkp = d[(k, p)];
                    let dkq = d[(k, q)];
                    d[(k, p)] = c * dkp - s * dkq;
                    d[(k, q)] = s * dkp + c * dkq;
                }
                for k in 0..n {
                    let dpk = d[(p, k)];
                    let dqk = d[(q, k)];
                    d[(p, k)] = c * dpk - s * dqk;
                    d[(q, k)] = s * dpk + c * dqk;
                }
                for k in 0..n {
                    let vkp = v[(k, p)];
                    let vkq = v[(k, q)];
                    v[(k, p)] = c * vkp - s * vkq;
                    v[(k, q)] = s * vkp + c * vkq;
                }
            }
        }
    }

    // Sort eigenpairs ascending
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| d[(i, i)].partial_cmp(&d[(j, j)]).unwrap());
    let eigenvalues: Vec<f64> = order.iter().map(|&i| d[(i, i)]).collect();
    let mut vectors = Mat::<f64>::zeros(n, n);
    for (new, &old) in order.iter().enumerate() {
        for k in 0..n {
            vectors[(k, new)] = v[(k, old)];
        }
    }
    Ok((eigenvalues, vectors))
}

/// Solve the generalized symmetric eigenproblem H c = e S c
///
/// Reduces to a standard problem via the Cholesky factorization of S:
/// with S = L Lᵀ, the problem becomes (L⁻¹ H L⁻ᵀ) y = e y and
/// c = L⁻ᵀ y.  A non-positive-definite S is reported as
/// `SingularMatrix` (the singular-overlap condition).
///
/// # Returns
///
/// Eigenvalues in ascending order and the eigenvector matrix (columns).
pub fn general_diagonalize(h: &Mat<f64>, s: &Mat<f64>) -> Result<(Vec<f64>, Mat<f64>)> {
    let n = h.nrows();
    let l = cholesky_lower(s)?;

    // B = L⁻¹ H L⁻ᵀ by two triangular solves
    let mut b = Mat::<f64>::zeros(n, n);
    // First: solve L Y = H (column by column, forward substitution)
    for j in 0..n {
        for i in 0..n {
            let mut sum = h[(i, j)];
            for k in 0..i {
                sum -= l[(i, k)] * b[(k, j)];
            }
            b[(i, j)] = sum / l[(i, i)];
        }
    }
    // Second: solve Z Lᵀ = Y, i.e. L (Zᵀ) = Yᵀ
    let mut z = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let mut sum = b[(i, j)];
            for k in 0..j {
                sum -= l[(j, k)] * z[(i, k)];
            }
            z[(i, j)] = sum / l[(j, j)];
        }
    }

    let (e, y) = jacobi_eigh(&z)?;

    // c = L⁻ᵀ y (back substitution per column)
    let mut c = Mat::<f64>::zeros(n, n);
    for j in 0..n {
        for i in (0..n).rev() {
            let mut sum = y[(i, j)];
            for k in (i + 1)..n {
                sum -= l[(k, i)] * c[(k, j)];
            }
            c[(i, j)] = sum / l[(i, i)];
        }
    }

    Ok((e, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lu_solve_simple() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 2.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 3.0;
        let x = solve_vec(&a, &[5.0, 10.0]).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix_reported() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 2.0;
        a[(1, 1)] = 4.0;
        match solve_vec(&a, &[1.0, 2.0]) {
            Err(UtilsError::SingularMatrix(_)) => {}
            other => panic!("expected SingularMatrix, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invert_roundtrip() {
        let mut a = Mat::<f64>::zeros(3, 3);
        a[(0, 0)] = 4.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 2.0;
        a[(1, 1)] = 5.0;
        a[(1, 2)] = 1.0;
        a[(2, 1)] = 1.0;
        a[(2, 2)] = 3.0;
        let ainv = invert(&a).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let mut s = 0.0;
                for k in 0..3 {
                    s += a[(i, k)] * ainv[(k, j)];
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(s, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_jacobi_eigh() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 2.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 2.0;
        let (e, v) = jacobi_eigh(&a).unwrap();
        assert_relative_eq!(e[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(e[1], 3.0, epsilon = 1e-12);
        // Eigenvector residual
        for (k, &ev) in e.iter().enumerate() {
            for i in 0..2 {
                let mut av = 0.0;
                for j in 0..2 {
                    av += a[(i, j)] * v[(j, k)];
                }
                assert_relative_eq!(av, ev * v[(i, k)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_general_diagonalize_reduces_to_standard() {
        // With S = I the generalized problem is the standard one
        let mut h = Mat::<f64>::zeros(2, 2);
        h[(0, 0)] = 1.0;
        h[(0, 1)] = 0.5;
        h[(1, 0)] = 0.5;
        h[(1, 1)] = 2.0;
        let s = Mat::<f64>::identity(2, 2);
        let (e, _) = general_diagonalize(&h, &s).unwrap();
        let (e2, _) = jacobi_eigh(&h).unwrap();
        assert_relative_eq!(e[0], e2[0], epsilon = 1e-12);
        assert_relative_eq!(e[1], e2[1], epsilon = 1e-12);
    }

    #[test]
    fn test_general_diagonalize_singular_overlap() {
        let h = Mat::<f64>::identity(2, 2);
        let mut s = Mat::<f64>::zeros(2, 2);
        s[(0, 0)] = 1.0;
        s[(0, 1)] = 1.0;
        s[(1, 0)] = 1.0;
        s[(1, 1)] = 1.0;
        match general_diagonalize(&h, &s) {
            Err(UtilsError::SingularMatrix(_)) => {}
            _ => panic!("expected singular-overlap error"),
        }
    }

    #[test]
    fn test_generalized_eigenproblem_residual() {
        let mut h = Mat::<f64>::zeros(3, 3);
        let mut s = Mat::<f64>::zeros(3, 3);
        for i in 0..3 {
            s[(i, i)] = 1.0;
            h[(i, i)] = (i + 1) as f64;
        }
        s[(0, 1)] = 0.2;
        s[(1, 0)] = 0.2;
        h[(0, 2)] = 0.3;
        h[(2, 0)] = 0.3;
        let (e, c) = general_diagonalize(&h, &s).unwrap();
        for k in 0..3 {
            for i in 0..3 {
                let mut hc = 0.0;
                let mut sc = 0.0;
                for j in 0..3 {
                    hc += h[(i, j)] * c[(j, k)];
                    sc += s[(i, j)] * c[(j, k)];
                }
                assert_relative_eq!(hc, e[k] * sc, epsilon = 1e-10);
            }
        }
    }
}
