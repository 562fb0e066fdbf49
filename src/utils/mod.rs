/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Utility functions shared across the crate
//!
//! Physical constants, special functions and the dense linear-algebra
//! kernels used by the atomic solvers and the setup assembly.

pub mod constants;
pub mod errors;
pub mod linear_algebra;
pub mod math;

pub use errors::{Result, UtilsError};

/// Pack a symmetric matrix into upper-triangular row-major order.
///
/// The packed index p enumerates pairs (i1, i2) with i1 <= i2:
/// p = i2 + i1 * n - i1 * (i1 + 1) / 2.  Off-diagonal entries are stored
/// once; [`unpack`] restores the full symmetric matrix.
pub fn pack(a_ii: &ndarray::Array2<f64>) -> ndarray::Array1<f64> {
    let n = a_ii.nrows();
    let mut a_p = ndarray::Array1::zeros(n * (n + 1) / 2);
    let mut p = 0;
    for i1 in 0..n {
        for i2 in i1..n {
            a_p[p] = a_ii[[i1, i2]];
            p += 1;
        }
    }
    a_p
}

/// Pack a symmetric matrix, doubling the off-diagonal elements.
///
/// This is the packing used for quantities that get contracted against a
/// packed density matrix, so that the sum over the packed index reproduces
/// the full double sum over (i1, i2).
pub fn pack2(a_ii: &ndarray::Array2<f64>) -> ndarray::Array1<f64> {
    let n = a_ii.nrows();
    let mut a_p = ndarray::Array1::zeros(n * (n + 1) / 2);
    let mut p = 0;
    for i1 in 0..n {
        a_p[p] = a_ii[[i1, i1]];
        p += 1;
        for i2 in i1 + 1..n {
            a_p[p] = a_ii[[i1, i2]] + a_ii[[i2, i1]];
            p += 1;
        }
    }
    a_p
}

/// Unpack an upper-triangular packed vector into a full symmetric matrix.
pub fn unpack(a_p: &ndarray::Array1<f64>) -> ndarray::Array2<f64> {
    let np = a_p.len();
    // n (n + 1) / 2 = np
    let n = ((((8 * np + 1) as f64).sqrt() as usize) - 1) / 2;
    let mut a_ii = ndarray::Array2::zeros((n, n));
    let mut p = 0;
    for i1 in 0..n {
        for i2 in i1..n {
            a_ii[[i1, i2]] = a_p[p];
            a_ii[[i2, i1]] = a_p[p];
            p += 1;
        }
    }
    a_ii
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_pack_unpack_roundtrip() {
        let a = array![[1.0, 2.0, 3.0], [2.0, 4.0, 5.0], [3.0, 5.0, 6.0]];
        let p = pack(&a);
        assert_eq!(p.len(), 6);
        let b = unpack(&p);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a[[i, j]], b[[i, j]], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_pack2_doubles_offdiagonal() {
        let a = array![[1.0, 2.0], [2.0, 3.0]];
        let p = pack2(&a);
        assert_relative_eq!(p[0], 1.0);
        assert_relative_eq!(p[1], 4.0);
        assert_relative_eq!(p[2], 3.0);
    }
}
