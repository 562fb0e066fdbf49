/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Exchange-correlation kernels
//!
//! The generator and the setup assembly treat the kernel as an opaque
//! function: given a density it returns an energy density and a
//! potential.  Shipped kernels: LDA (Perdew-Wang 92 correlation with
//! Slater exchange) and PBE.  Gradient corrections are evaluated on the
//! radial grid; the flat-array entry point used by grid consumers applies
//! the local part only (the 3D gradient plumbing belongs to the
//! self-consistency loop, which is outside this crate).

use crate::radial::RadialGrid;
use ndarray::Array1;
use std::f64::consts::PI;
use thiserror::Error;

/// Errors from kernel construction
#[derive(Error, Debug)]
pub enum XCError {
    /// Unknown functional name
    #[error("Unknown exchange-correlation functional: {0}")]
    UnknownFunctional(String),
}

/// A specialized Result type for xc operations
pub type Result<T> = std::result::Result<T, XCError>;

const CEX: f64 = 0.7385587663820224; // (3/4)(3/pi)^(1/3)

// PW92 correlation parameters (spin-unpolarized)
const PW_A: f64 = 0.031091;
const PW_ALPHA1: f64 = 0.21370;
const PW_BETA1: f64 = 7.5957;
const PW_BETA2: f64 = 3.5876;
const PW_BETA3: f64 = 1.6382;
const PW_BETA4: f64 = 0.49294;

// PBE parameters
const PBE_KAPPA: f64 = 0.804;
const PBE_MU: f64 = 0.2195149727645171;
const PBE_BETA: f64 = 0.06672455060314922;
const PBE_GAMMA: f64 = 0.031090690869654895; // (1 - ln 2) / pi²

/// The closed set of shipped functionals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XCFunctional {
    Lda,
    Pbe,
}

/// Exchange-correlation kernel
#[derive(Debug, Clone)]
pub struct XCKernel {
    functional: XCFunctional,
    name: String,
}

impl XCKernel {
    /// Create a kernel by name ("LDA" or "PBE", case-insensitive)
    pub fn new(name: &str) -> Result<Self> {
        let functional = match name.to_uppercase().as_str() {
            "LDA" => XCFunctional::Lda,
            "PBE" => XCFunctional::Pbe,
            _ => return Err(XCError::UnknownFunctional(name.to_string())),
        };
        Ok(XCKernel {
            functional,
            name: name.to_uppercase(),
        })
    }

    /// Canonical functional name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functional(&self) -> XCFunctional {
        self.functional
    }

    /// Pointwise evaluation.
    ///
    /// # Arguments
    ///
    /// * `n` - Density
    /// * `sigma` - Squared density gradient |∇n|²
    ///
    /// # Returns
    ///
    /// (energy density per volume, dE/dn, dE/dsigma)
    fn evaluate_point(&self, n: f64, sigma: f64) -> (f64, f64, f64) {
        if n < 1e-20 {
            return (0.0, 0.0, 0.0);
        }

        // Slater exchange
        let ex = -CEX * n.powf(1.0 / 3.0);
        let mut e = n * ex;
        let mut dedn = 4.0 / 3.0 * ex;
        let mut dedsigma = 0.0;

        // PW92 correlation
        let rs = (3.0 / (4.0 * PI * n)).powf(1.0 / 3.0);
        let sq = rs.sqrt();
        let q0 = -2.0 * PW_A * (1.0 + PW_ALPHA1 * rs);
        let q1 = 2.0
            * PW_A
            * (PW_BETA1 * sq + PW_BETA2 * rs + PW_BETA3 * rs * sq + PW_BETA4 * rs * rs);
        let dq1 = PW_A
            * (PW_BETA1 / sq + 2.0 * PW_BETA2 + 3.0 * PW_BETA3 * sq + 4.0 * PW_BETA4 * rs);
        let arg = 1.0 + 1.0 / q1;
        let ec = q0 * arg.ln();
        let dec_drs = -2.0 * PW_A * PW_ALPHA1 * arg.ln() - q0 * dq1 / (q1 * q1 + q1);
        let dec_dn = -dec_drs * rs / (3.0 * n);

        e += n * ec;
        dedn += ec + n * dec_dn;

        if self.functional == XCFunctional::Pbe {
            let kf = (3.0 * PI * PI * n).powf(1.0 / 3.0);

            // Exchange enhancement F(s²)
            let s2 = sigma / (4.0 * kf * kf * n * n);
            let denom = PBE_KAPPA + PBE_MU * s2;
            let f = 1.0 + PBE_KAPPA - PBE_KAPPA * PBE_KAPPA / denom;
            let fp = PBE_MU * PBE_KAPPA * PBE_KAPPA / (denom * denom);
            e += n * ex * (f - 1.0);
            dedn += ex * (4.0 / 3.0 * (f - 1.0) - 8.0 / 3.0 * s2 * fp);
            dedsigma += ex * fp / (4.0 * kf * kf * n);

            // Correlation gradient term H(t², A)
            let ks2 = 4.0 * kf / PI;
            let y = sigma / (4.0 * ks2 * n * n);
            let expe = (-ec / PBE_GAMMA).exp();
            if (expe - 1.0).abs() > 1e-30 {
                let a = PBE_BETA / PBE_GAMMA / (expe - 1.0);
                let nn = y * (1.0 + a * y);
                let dd = 1.0 + a * y + a * a * y * y;
                let g = nn / dd;
                let h = PBE_GAMMA * (1.0 + PBE_BETA * g / PBE_GAMMA).ln();
                let pref = PBE_BETA / (1.0 + PBE_BETA * g / PBE_GAMMA);
                let dg_dy = ((1.0 + 2.0 * a * y) * dd - nn * (a + 2.0 * a * a * y))
                    / (dd * dd);
                let dg_da =
                    (y * y * dd - nn * (y + 2.0 * a * y * y)) / (dd * dd);
                let dh_dy = pref * dg_dy;
                let dh_da = pref * dg_da;
                let da_dec = PBE_BETA / PBE_GAMMA * expe / PBE_GAMMA
                    / ((expe - 1.0) * (expe - 1.0));
                let dy_dn = -7.0 / 3.0 * y / n;
                let dy_dsigma = 1.0 / (4.0 * ks2 * n * n);

                e += n * h;
                dedn += h + n * (dh_dy * dy_dn + dh_da * da_dec * dec_dn);
                dedsigma += n * dh_dy * dy_dsigma;
            }
        }

        (e, dedn, dedsigma)
    }

    /// Evaluate the kernel for a spherical density on a radial grid.
    ///
    /// # Arguments
    ///
    /// * `rgd` - The radial grid
    /// * `n_g` - Spherical density
    /// * `v_g` - Output potential (overwritten)
    ///
    /// # Returns
    ///
    /// The exchange-correlation energy
    pub fn calculate_spherical(
        &self,
        rgd: &RadialGrid,
        n_g: &Array1<f64>,
        v_g: &mut Array1<f64>,
    ) -> f64 {
        let ng = n_g.len();
        let dndr_g = if self.functional == XCFunctional::Pbe {
            rgd.derivative(n_g)
        } else {
            Array1::zeros(ng)
        };

        let mut e_g = Array1::zeros(ng);
        let mut w_g = Array1::zeros(ng);
        for g in 0..ng {
            let sigma = dndr_g[g] * dndr_g[g];
            let (e, dedn, dedsigma) = self.evaluate_point(n_g[g], sigma);
            e_g[g] = e;
            v_g[g] = dedn;
            w_g[g] = 2.0 * dedsigma * dndr_g[g];
        }

        if self.functional == XCFunctional::Pbe {
            // v -= (1/r²) d/dr (r² w)
            let r2w_g = Array1::from_iter(
                (0..ng).map(|g| rgd.r_g[g] * rgd.r_g[g] * w_g[g]),
            );
            let div_g = rgd.derivative(&r2w_g);
            for g in 1..ng {
                v_g[g] -= div_g[g] / (rgd.r_g[g] * rgd.r_g[g]);
            }
            if ng > 1 {
                v_g[0] = v_g[1];
            }
        }

        rgd.integrate(&e_g, 0)
    }

    /// Flat-array evaluation of the local part, as consumed by grid code.
    ///
    /// Fills `e` with the energy density and adds the potential to `v`;
    /// any gradient corrections are omitted on this path.
    pub fn calculate(&self, e: &mut [f64], n: &[f64], v: &mut [f64]) {
        for i in 0..n.len() {
            let (ei, vi, _) = self.evaluate_point(n[i], 0.0);
            e[i] = ei;
            v[i] += vi;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_name_parsing() {
        assert!(XCKernel::new("LDA").is_ok());
        assert!(XCKernel::new("pbe").is_ok());
        assert!(matches!(
            XCKernel::new("B3LYP"),
            Err(XCError::UnknownFunctional(_))
        ));
    }

    #[test]
    fn test_lda_homogeneous_gas() {
        let xc = XCKernel::new("LDA").unwrap();
        // rs = 2: known PW92 values ex = -0.4582 / rs ... ec ~ -0.0448
        let rs: f64 = 2.0;
        let n = 3.0 / (4.0 * PI * rs.powi(3));
        let (e, v, _) = xc.evaluate_point(n, 0.0);
        let eps = e / n;
        let ex = -CEX * n.powf(1.0 / 3.0);
        assert_relative_eq!(ex, -0.4582 / rs, max_relative = 1e-3);
        assert_relative_eq!(eps - ex, -0.044756, max_relative = 1e-3);
        assert!(v < 0.0);
    }

    #[test]
    fn test_pbe_reduces_to_lda_for_zero_gradient() {
        let lda = XCKernel::new("LDA").unwrap();
        let pbe = XCKernel::new("PBE").unwrap();
        let n = 0.3;
        let (el, vl, _) = lda.evaluate_point(n, 0.0);
        let (ep, vp, _) = pbe.evaluate_point(n, 0.0);
        assert_relative_eq!(el, ep, epsilon = 1e-12);
        assert_relative_eq!(vl, vp, epsilon = 1e-12);
    }

    #[test]
    fn test_potential_is_functional_derivative() {
        // Finite-difference check of dE/dn at fixed sigma
        for name in ["LDA", "PBE"] {
            let xc = XCKernel::new(name).unwrap();
            let n = 0.2;
            let sigma = 0.01;
            let h = 1e-7;
            let (_, dedn, dedsigma) = xc.evaluate_point(n, sigma);
            let (ep, _, _) = xc.evaluate_point(n + h, sigma);
            let (em, _, _) = xc.evaluate_point(n - h, sigma);
            assert_relative_eq!(dedn, (ep - em) / (2.0 * h), max_relative = 1e-5);
            let (ep, _, _) = xc.evaluate_point(n, sigma + h);
            let (em, _, _) = xc.evaluate_point(n, sigma - h);
            assert_relative_eq!(
                dedsigma,
                (ep - em) / (2.0 * h),
                max_relative = 1e-4,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_spherical_energy_sign() {
        let rgd = RadialGrid::new(0.4, 400);
        let xc = XCKernel::new("LDA").unwrap();
        let n_g = rgd.r_g.mapv(|r: f64| (-r * r).exp());
        let mut v_g = rgd.zeros();
        let exc = xc.calculate_spherical(&rgd, &n_g, &mut v_g);
        assert!(exc < 0.0);
        assert!(v_g[10] < 0.0);
    }
}
