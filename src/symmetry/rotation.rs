/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Rotation matrices for real spherical harmonics
//!
//! For a Cartesian rotation O the matrix D(l) satisfies
//! Y_lm(O u) = sum_m' D[m, m'] Y_lm'(u).  The matrices are obtained by
//! projecting the rotated harmonics onto the harmonic basis with an
//! exact least-squares solve over sampled directions, the same route the
//! Gaunt tensor uses.

use super::errors::Result;
use crate::utils::linear_algebra::lu_solve;
use crate::utils::math::real_spherical_harmonic;
use faer::Mat;
use ndarray::Array2;

/// Rotation matrix of the real spherical harmonics of order l
///
/// # Arguments
///
/// * `l` - Angular momentum (0 to 4)
/// * `op_vv` - Orthogonal 3x3 rotation in Cartesian coordinates
pub fn rotation_matrix(l: usize, op_vv: &Array2<f64>) -> Result<Array2<f64>> {
    let nm = 2 * l + 1;
    let npts = (4 * nm * nm).max(64);
    let golden = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());

    let mut a = Mat::<f64>::zeros(npts, nm);
    let mut b = Mat::<f64>::zeros(npts, nm);
    for p in 0..npts {
        let z = 1.0 - 2.0 * (p as f64 + 0.5) / npts as f64;
        let rho = (1.0 - z * z).sqrt();
        let phi = golden * p as f64;
        let u = [rho * phi.cos(), rho * phi.sin(), z];
        let mut ou = [0.0; 3];
        for v in 0..3 {
            for w in 0..3 {
                ou[v] += op_vv[(v, w)] * u[w];
            }
        }
        for m in 0..nm {
            let mq = m as i32 - l as i32;
            a[(p, m)] = real_spherical_harmonic(l as i32, mq, u[0], u[1], u[2])?;
            b[(p, m)] = real_spherical_harmonic(l as i32, mq, ou[0], ou[1], ou[2])?;
        }
    }

    // Normal equations: (A^T A) D^T = A^T B
    let mut ata = Mat::<f64>::zeros(nm, nm);
    let mut atb = Mat::<f64>::zeros(nm, nm);
    for i in 0..nm {
        for j in 0..nm {
            let mut s = 0.0;
            let mut t = 0.0;
            for p in 0..npts {
                s += a[(p, i)] * a[(p, j)];
                t += a[(p, i)] * b[(p, j)];
            }
            ata[(i, j)] = s;
            atb[(i, j)] = t;
        }
    }
    let dt = lu_solve(&ata, &atb)?;

    let mut d = Array2::zeros((nm, nm));
    for m in 0..nm {
        for mp in 0..nm {
            let value = dt[(mp, m)];
            d[(m, mp)] = if value.abs() < 1e-12 { 0.0 } else { value };
        }
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_identity_rotation() {
        let eye = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for l in 0..4 {
            let d = rotation_matrix(l, &eye).unwrap();
            for m1 in 0..(2 * l + 1) {
                for m2 in 0..(2 * l + 1) {
                    let expected = if m1 == m2 { 1.0 } else { 0.0 };
                    assert_relative_eq!(d[(m1, m2)], expected, epsilon = 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_rotation_is_orthogonal() {
        // 90 degree rotation about z
        let rot = array![[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        for l in 0..4 {
            let d = rotation_matrix(l, &rot).unwrap();
            let nm = 2 * l + 1;
            for m1 in 0..nm {
                for m2 in 0..nm {
                    let mut s = 0.0;
                    for k in 0..nm {
                        s += d[(m1, k)] * d[(m2, k)];
                    }
                    let expected = if m1 == m2 { 1.0 } else { 0.0 };
                    assert_relative_eq!(s, expected, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_p_channel_follows_vectors() {
        // The l=1 harmonics transform like (y, z, x); a rotation mapping
        // x -> y must permute them accordingly
        let rot = array![[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let d = rotation_matrix(1, &rot).unwrap();
        // Y_1,1 ~ x -> Y(O u): x' = -y: coefficient of Y_1,-1 is -1...
        // check the defining relation at a sample direction instead
        let u = [0.3, 0.5, 0.81];
        let ou = [-u[1], u[0], u[2]];
        for m in 0..3 {
            let lhs =
                real_spherical_harmonic(1, m as i32 - 1, ou[0], ou[1], ou[2]).unwrap();
            let mut rhs = 0.0;
            for mp in 0..3 {
                rhs += d[(m, mp)]
                    * real_spherical_harmonic(1, mp as i32 - 1, u[0], u[1], u[2]).unwrap();
            }
            assert_relative_eq!(lhs, rhs, epsilon = 1e-9);
        }
    }
}
