/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Gaussian basis for the radial atomic problem
//!
//! Each angular-momentum channel is expanded in primitives
//! r^l exp(-alpha r²) on a geometric exponent ladder.  Overlap and
//! kinetic matrices are analytic; the near-linear-dependence of the
//! ladder is removed by diagonalizing the overlap and dropping
//! eigenvectors below a threshold.

use super::errors::Result;
use crate::radial::RadialGrid;
use crate::utils::linear_algebra::jacobi_eigh;
use faer::Mat;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Orthonormalized Gaussian basis for one angular-momentum channel
pub struct GaussianBasis {
    /// Angular momentum
    pub l: usize,
    /// Primitive exponents
    pub alpha_b: Vec<f64>,
    /// Overlap eigenvalue threshold used for the orthogonalization
    pub eps: f64,
    /// Kinetic-energy matrix in the orthonormal basis
    pub t_bb: Array2<f64>,
    /// Orthonormal basis functions on the radial grid
    pub basis_bg: Vec<Array1<f64>>,
}

impl GaussianBasis {
    /// Build the orthonormalized basis.
    ///
    /// # Arguments
    ///
    /// * `l` - Angular momentum
    /// * `alpha_b` - Primitive exponents
    /// * `rgd` - Radial grid for the real-space representation
    /// * `eps` - Overlap eigenvalue cutoff (primitive combinations with
    ///   smaller overlap eigenvalues are dropped)
    pub fn new(l: usize, alpha_b: &[f64], rgd: &RadialGrid, eps: f64) -> Result<Self> {
        let nprim = alpha_b.len();

        // Analytic overlap and kinetic matrices of normalized primitives
        let mut s = Mat::<f64>::zeros(nprim, nprim);
        let mut t = Mat::<f64>::zeros(nprim, nprim);
        for a in 0..nprim {
            for b in 0..nprim {
                let aa = alpha_b[a];
                let ab = alpha_b[b];
                let overlap = (2.0 * (aa * ab).sqrt() / (aa + ab)).powf(l as f64 + 1.5);
                s[(a, b)] = overlap;
                t[(a, b)] = (2 * l + 3) as f64 * aa * ab / (aa + ab) * overlap;
            }
        }

        // Orthogonalize: keep overlap eigenvectors above eps
        let (sval, svec) = jacobi_eigh(&s)?;
        let kept: Vec<usize> = (0..nprim).filter(|&k| sval[k] > eps).collect();
        let nbasis = kept.len();
        let mut q = Array2::zeros((nprim, nbasis));
        for (col, &k) in kept.iter().enumerate() {
            let norm = sval[k].sqrt();
            for a in 0..nprim {
                q[(a, col)] = svec[(a, k)] / norm;
            }
        }

        // T in the orthonormal basis
        let mut t_bb = Array2::zeros((nbasis, nbasis));
        for i in 0..nbasis {
            for j in 0..nbasis {
                let mut sum = 0.0;
                for a in 0..nprim {
                    for b in 0..nprim {
                        sum += q[(a, i)] * t[(a, b)] * q[(b, j)];
                    }
                }
                t_bb[(i, j)] = sum;
            }
        }

        // Real-space representation: normalized primitives combined by Q
        // (norm: ∫ prim² r² dr = 1)
        let gamma = PI.sqrt() * double_factorial_odd(l) / 2.0f64.powi(l as i32 + 1);
        let mut prim_ag = Vec::with_capacity(nprim);
        for &alpha in alpha_b {
            let norm = (2.0 * (2.0 * alpha).powf(l as f64 + 1.5) / gamma).sqrt();
            let prim: Array1<f64> = rgd
                .r_g
                .mapv(|r| norm * r.powi(l as i32) * (-alpha * r * r).exp());
            prim_ag.push(prim);
        }
        let mut basis_bg = Vec::with_capacity(nbasis);
        for col in 0..nbasis {
            let mut b_g = rgd.zeros();
            for a in 0..nprim {
                b_g.scaled_add(q[(a, col)], &prim_ag[a]);
            }
            basis_bg.push(b_g);
        }

        Ok(GaussianBasis {
            l,
            alpha_b: alpha_b.to_vec(),
            eps,
            t_bb,
            basis_bg,
        })
    }

    /// Number of orthonormal basis functions
    pub fn len(&self) -> usize {
        self.basis_bg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basis_bg.is_empty()
    }

    /// Potential matrix <b | v | b'> for a potential given as r v(r)
    pub fn calculate_potential_matrix(&self, rgd: &RadialGrid, vr_g: &Array1<f64>) -> Array2<f64> {
        let nb = self.len();
        let mut v_bb = Array2::zeros((nb, nb));
        for i in 0..nb {
            for j in i..nb {
                let mut sum = 0.0;
                for g in 1..rgd.len().min(vr_g.len()) {
                    sum += self.basis_bg[i][g]
                        * self.basis_bg[j][g]
                        * vr_g[g]
                        * rgd.r_g[g]
                        * rgd.dr_g[g];
                }
                v_bb[(i, j)] = sum;
                v_bb[(j, i)] = sum;
            }
        }
        v_bb
    }
}

/// (2l+1)!! as a float
fn double_factorial_odd(l: usize) -> f64 {
    let mut p = 1.0;
    let mut k = 2 * l + 1;
    while k > 1 {
        p *= k as f64;
        k -= 2;
    }
    p
}

/// Geometric exponent ladder from alpha_min to alpha_max
pub fn exponent_ladder(alpha_min: f64, alpha_max: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| alpha_min * (alpha_max / alpha_min).powf(i as f64 / (count - 1) as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_orthonormal_on_grid() {
        let rgd = RadialGrid::new(0.4, 1000);
        let alpha_b = exponent_ladder(0.05, 50.0, 30);
        let basis = GaussianBasis::new(0, &alpha_b, &rgd, 1e-9).unwrap();
        assert!(basis.len() > 5);
        for i in 0..basis.len().min(6) {
            for j in 0..basis.len().min(6) {
                let mut s = 0.0;
                for g in 0..rgd.len() {
                    s += basis.basis_bg[i][g]
                        * basis.basis_bg[j][g]
                        * rgd.r_g[g]
                        * rgd.r_g[g]
                        * rgd.dr_g[g];
                }
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(s, expected, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_hydrogen_in_gaussian_basis() {
        // H = T - 1/r in the s basis should give e_1s close to -0.5
        let rgd = RadialGrid::new(0.4, 1000);
        let alpha_b = exponent_ladder(0.01, 100.0, 60);
        let basis = GaussianBasis::new(0, &alpha_b, &rgd, 1e-8).unwrap();
        let vr_g = Array1::from_elem(rgd.len(), -1.0);
        let v_bb = basis.calculate_potential_matrix(&rgd, &vr_g);

        let nb = basis.len();
        let mut h = Mat::<f64>::zeros(nb, nb);
        for i in 0..nb {
            for j in 0..nb {
                h[(i, j)] = basis.t_bb[(i, j)] + v_bb[(i, j)];
            }
        }
        let (e, _) = jacobi_eigh(&h).unwrap();
        assert_relative_eq!(e[0], -0.5, epsilon = 1e-5);
        // 2s
        assert_relative_eq!(e[1], -0.125, epsilon = 1e-4);
    }
}
