/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Gaunt coefficients for real spherical harmonics
//!
//! G_LLL[L1, L2, L3] = ∫ Y_L1 Y_L2 Y_L3 dΩ couples angular-momentum
//! channels in multipole expansions and exchange integrals.  The tensor
//! for products up to l1, l2 <= lmax (and l3 <= 2 lmax) is computed once
//! per lmax by projecting harmonic products onto the harmonic basis: the
//! product lies exactly in the span of harmonics with l3 <= l1 + l2, so a
//! least-squares solve over a deterministic set of sample directions
//! recovers the coefficients to machine precision.

use crate::utils::linear_algebra;
use crate::utils::math::real_spherical_harmonic_by_index;
use faer::Mat;
use ndarray::Array3;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

static CACHE: Lazy<Mutex<HashMap<usize, Arc<Array3<f64>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Gaunt tensor for products of harmonics with l <= lmax.
///
/// Shape: ((lmax+1)², (lmax+1)², (2 lmax+1)²).  Results are cached per
/// lmax for the lifetime of the process.
pub fn gaunt(lmax: usize) -> Arc<Array3<f64>> {
    let mut cache = CACHE.lock().unwrap();
    if let Some(hit) = cache.get(&lmax) {
        return hit.clone();
    }
    let tensor = Arc::new(compute_gaunt(lmax));
    cache.insert(lmax, tensor.clone());
    tensor
}

fn compute_gaunt(lmax: usize) -> Array3<f64> {
    let nl1 = (lmax + 1) * (lmax + 1);
    let nl3 = (2 * lmax + 1) * (2 * lmax + 1);
    let npts = (3 * nl3).max(256);

    let points = fibonacci_sphere(npts);

    // Sampled harmonic basis and its normal equations
    let mut a = Mat::<f64>::zeros(npts, nl3);
    for (p, &(x, y, z)) in points.iter().enumerate() {
        for big_l in 0..nl3 {
            a[(p, big_l)] = real_spherical_harmonic_by_index(big_l, x, y, z)
                .expect("valid harmonic index");
        }
    }
    let mut m = Mat::<f64>::zeros(nl3, nl3);
    for i in 0..nl3 {
        for j in 0..nl3 {
            let mut s = 0.0;
            for p in 0..npts {
                s += a[(p, i)] * a[(p, j)];
            }
            m[(i, j)] = s;
        }
    }

    // One right-hand side per (L1, L2) pair, solved against the shared
    // normal matrix
    let mut rhs = Mat::<f64>::zeros(nl3, nl1 * nl1);
    for l1 in 0..nl1 {
        for l2 in 0..nl1 {
            let col = l1 * nl1 + l2;
            for i in 0..nl3 {
                let mut s = 0.0;
                for p in 0..npts {
                    s += a[(p, i)] * a[(p, l1)] * a[(p, l2)];
                }
                rhs[(i, col)] = s;
            }
        }
    }
    let coeffs = linear_algebra::lu_solve(&m, &rhs)
        .expect("harmonic sampling matrix is well conditioned");

    let mut g = Array3::zeros((nl1, nl1, nl3));
    for l1 in 0..nl1 {
        for l2 in 0..nl1 {
            let col = l1 * nl1 + l2;
            for l3 in 0..nl3 {
                let value = coeffs[(l3, col)];
                g[(l1, l2, l3)] = if value.abs() < 1e-12 { 0.0 } else { value };
            }
        }
    }
    g
}

/// Deterministic, nearly uniform directions on the unit sphere
fn fibonacci_sphere(n: usize) -> Vec<(f64, f64, f64)> {
    let golden = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let rho = (1.0 - z * z).sqrt();
            let phi = golden * i as f64;
            (rho * phi.cos(), rho * phi.sin(), z)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_monopole_column_is_overlap() {
        // ∫ Y_L1 Y_L2 Y_00 dΩ = delta(L1, L2) / sqrt(4 pi)
        let g = gaunt(2);
        let s = 1.0 / (4.0 * PI).sqrt();
        for l1 in 0..9 {
            for l2 in 0..9 {
                let expected = if l1 == l2 { s } else { 0.0 };
                assert_relative_eq!(g[(l1, l2, 0)], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_symmetry_in_first_two_indices() {
        let g = gaunt(2);
        for l1 in 0..9 {
            for l2 in 0..9 {
                for l3 in 0..25 {
                    assert_relative_eq!(
                        g[(l1, l2, l3)],
                        g[(l2, l1, l3)],
                        epsilon = 1e-10
                    );
                }
            }
        }
    }

    #[test]
    fn test_product_expansion() {
        // Y_L1 Y_L2 = sum_L3 G[L1,L2,L3] Y_L3 pointwise
        let g = gaunt(3);
        let dirs = [(0.3, -0.5, 0.81), (0.1, 0.95, -0.29), (-0.7, 0.1, 0.7)];
        for l1 in 0..16 {
            for l2 in 0..16 {
                for &(x, y, z) in &dirs {
                    let lhs = real_spherical_harmonic_by_index(l1, x, y, z).unwrap()
                        * real_spherical_harmonic_by_index(l2, x, y, z).unwrap();
                    let mut rhs = 0.0;
                    for l3 in 0..49 {
                        rhs += g[(l1, l2, l3)]
                            * real_spherical_harmonic_by_index(l3, x, y, z).unwrap();
                    }
                    assert_relative_eq!(lhs, rhs, epsilon = 1e-8);
                }
            }
        }
    }

    #[test]
    fn test_px_px_expansion_values() {
        // Y_1x² = 1/sqrt(4 pi) Y_00 + known d-channel admixtures; the
        // s-coefficient is the classic 1/sqrt(4 pi)
        let g = gaunt(1);
        let l_px = 3; // l=1, m=+1
        assert_relative_eq!(
            g[(l_px, l_px, 0)],
            1.0 / (4.0 * PI).sqrt(),
            epsilon = 1e-10
        );
    }
}
