/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Angular-momentum channel of the radial atomic problem
//!
//! A [`Channel`] holds the occupations, eigenvalues and radial
//! wavefunctions for one l, solved either in the Gaussian basis or by
//! direct outward/inward integration of the radial equation (the route
//! used for scalar-relativistic refinement, unbound partial waves and
//! logarithmic derivatives).

use super::errors::{AtomError, Result};
use super::gaussian::GaussianBasis;
use crate::radial::RadialGrid;
use crate::utils::constants::SPEED_OF_LIGHT;
use crate::utils::linear_algebra::jacobi_eigh;
use faer::Mat;
use ndarray::Array1;
use std::f64::consts::PI;

/// Maximum number of wavefunctions kept in real space per channel
const MAX_STORED: usize = 25;

/// One angular-momentum channel
pub struct Channel {
    /// Angular momentum
    pub l: usize,
    /// Occupations of the bound states, indexed by n - l - 1
    pub f_n: Vec<f64>,
    /// Eigenvalues from the last solve (bound and virtual)
    pub e_n: Vec<f64>,
    /// Radial wavefunctions phi(r) (not u = r phi) for the lowest states,
    /// normalized to ∫ phi² r² dr = 1
    pub phi_ng: Vec<Array1<f64>>,
}

impl Channel {
    pub fn new(l: usize) -> Self {
        Channel {
            l,
            f_n: Vec::new(),
            e_n: Vec::new(),
            phi_ng: Vec::new(),
        }
    }

    /// Solve the channel in the Gaussian basis for the given potential
    /// (given as r v(r))
    pub fn solve(
        &mut self,
        basis: &GaussianBasis,
        rgd: &RadialGrid,
        vr_g: &Array1<f64>,
    ) -> Result<()> {
        let nb = basis.len();
        let v_bb = basis.calculate_potential_matrix(rgd, vr_g);
        let mut h = Mat::<f64>::zeros(nb, nb);
        for i in 0..nb {
            for j in 0..nb {
                h[(i, j)] = basis.t_bb[(i, j)] + v_bb[(i, j)];
            }
        }
        let (e_b, c_bb) = jacobi_eigh(&h)?;

        self.e_n = e_b;
        self.phi_ng.clear();
        for n in 0..nb.min(MAX_STORED) {
            let mut phi_g = rgd.zeros();
            for b in 0..nb {
                phi_g.scaled_add(c_bb[(b, n)], &basis.basis_bg[b]);
            }
            // Fix the sign so the wavefunction starts out positive
            let probe = phi_g[rgd.len() / 16];
            if probe < 0.0 {
                phi_g.mapv_inplace(|x| -x);
            }
            self.phi_ng.push(phi_g);
        }
        Ok(())
    }

    /// Density contribution of state n, f phi² / 4 pi
    pub fn calculate_density(&self, n: usize) -> Array1<f64> {
        self.phi_ng[n].mapv(|phi| phi * phi / (4.0 * PI))
    }

    /// Kinetic-energy-density contribution of state n
    pub fn calculate_kinetic_energy_density(&self, n: usize, rgd: &RadialGrid) -> Array1<f64> {
        let phi_g = &self.phi_ng[n];
        let dphidr_g = rgd.derivative(phi_g);
        let ll = (self.l * (self.l + 1)) as f64;
        let mut tau_g = rgd.zeros();
        for g in 1..rgd.len() {
            let r = rgd.r_g[g];
            tau_g[g] =
                (dphidr_g[g] * dphidr_g[g] + ll * phi_g[g] * phi_g[g] / (r * r)) / (8.0 * PI);
        }
        tau_g[0] = tau_g[1];
        tau_g
    }

    /// Integrate the radial equation outwards from the origin.
    ///
    /// Fills `u_g` (u = r phi) up to and including `gmax` and returns
    /// (du/dr at gmax, a), where a is the r -> 0 limit of phi / r^l
    /// belonging to the filled solution.
    ///
    /// # Arguments
    ///
    /// * `u_g` - Output array for u
    /// * `rgd` - Radial grid
    /// * `vr_g` - Potential as r v(r)
    /// * `gmax` - Last grid index to integrate to
    /// * `e` - Energy
    /// * `scalar_relativistic` - Use the scalar-relativistic equation
    /// * `z` - Nuclear charge (fixes the series expansion at the origin)
    /// * `pt_g` - Optional inhomogeneous projector term
    #[allow(clippy::too_many_arguments)]
    pub fn integrate_outwards(
        &self,
        u_g: &mut Array1<f64>,
        rgd: &RadialGrid,
        vr_g: &Array1<f64>,
        gmax: usize,
        e: f64,
        scalar_relativistic: bool,
        z: f64,
        pt_g: Option<&Array1<f64>>,
    ) -> Result<(f64, f64)> {
        if gmax >= rgd.len() || gmax < 2 {
            return Err(AtomError::Integration(format!(
                "gmax {} outside grid of {} points",
                gmax,
                rgd.len()
            )));
        }
        let l = self.l as f64;
        let dvrdg_g = rgd.derivative(vr_g);

        let sample = |a_g: &Array1<f64>, r: f64| -> f64 {
            let x = rgd.n as f64 * r / (rgd.beta + r);
            let g = (x as usize).min(a_g.len() - 2);
            let t = x - g as f64;
            (1.0 - t) * a_g[g] + t * a_g[g + 1]
        };

        let alpha2 = 1.0 / (SPEED_OF_LIGHT * SPEED_OF_LIGHT);
        let rhs = |r: f64, u: f64, p: f64| -> f64 {
            let vr = sample(vr_g, r);
            let v = vr / r;
            let mut w = l * (l + 1.0) / (r * r) * u;
            if scalar_relativistic {
                let m = 1.0 + 0.5 * alpha2 * (e - v);
                w += 2.0 * m * (v - e) * u;
                let dvrdr = sample(&dvrdg_g, r);
                let dvdr = (dvrdr - v) / r;
                let mp = -0.5 * alpha2 * dvdr;
                w += mp / m * (p - u / r);
            } else {
                w += 2.0 * (v - e) * u;
            }
            if let Some(pt) = pt_g {
                w += 2.0 * r * sample(pt, r);
            }
            w
        };

        // Series start: u = r^(l+1) (1 - Z r / (l+1) + ...)
        let r0 = rgd.r_g[1];
        let mut u = r0.powf(l + 1.0) * (1.0 - z * r0 / (l + 1.0));
        let mut p = (l + 1.0) * r0.powf(l) * (1.0 - z * r0 * (l + 2.0) / ((l + 1.0) * (l + 1.0)));
        u_g[0] = 0.0;
        u_g[1] = u;

        let mut scale = 1.0;
        for g in 1..gmax {
            let ra = rgd.r_g[g];
            let rb = rgd.r_g[g + 1];
            let dr = rb - ra;
            let k2 = (l * (l + 1.0) / (ra * ra)
                + 2.0 * (sample(vr_g, ra) / ra - e).abs())
            .abs();
            let nsub = ((dr * k2.sqrt() / 0.02).ceil() as usize).clamp(2, 2000);
            let h = dr / nsub as f64;
            for i in 0..nsub {
                let r = ra + i as f64 * h;
                // RK4 on the first-order system (u, p)
                let k1u = p;
                let k1p = rhs(r, u, p);
                let k2u = p + 0.5 * h * k1p;
                let k2p = rhs(r + 0.5 * h, u + 0.5 * h * k1u, p + 0.5 * h * k1p);
                let k3u = p + 0.5 * h * k2p;
                let k3p = rhs(r + 0.5 * h, u + 0.5 * h * k2u, p + 0.5 * h * k2p);
                let k4u = p + h * k3p;
                let k4p = rhs(r + h, u + h * k3u, p + h * k3p);
                u += h / 6.0 * (k1u + 2.0 * k2u + 2.0 * k3u + k4u);
                p += h / 6.0 * (k1p + 2.0 * k2p + 2.0 * k3p + k4p);
            }
            u_g[g + 1] = u;
            if pt_g.is_none() && u.abs() > 1e250 {
                for v in u_g.iter_mut().take(g + 2) {
                    *v *= 1e-250;
                }
                u *= 1e-250;
                p *= 1e-250;
                scale *= 1e-250;
            }
        }
        Ok((p, scale))
    }

    /// Integrate the radial equation inwards from `gstart` down to `gmin`.
    ///
    /// Fills `u_g` on [gmin, gstart] with a decaying solution and returns
    /// du/dr at gmin.  Only meaningful for e < 0.
    pub fn integrate_inwards(
        &self,
        u_g: &mut Array1<f64>,
        rgd: &RadialGrid,
        vr_g: &Array1<f64>,
        gmin: usize,
        e: f64,
        gstart: usize,
    ) -> Result<f64> {
        if gstart >= rgd.len() || gmin + 2 > gstart {
            return Err(AtomError::Integration(format!(
                "inward range [{}, {}] invalid for grid of {} points",
                gmin,
                gstart,
                rgd.len()
            )));
        }
        let l = self.l as f64;
        let sample = |a_g: &Array1<f64>, r: f64| -> f64 {
            let x = rgd.n as f64 * r / (rgd.beta + r);
            let g = (x as usize).min(a_g.len() - 2);
            let t = x - g as f64;
            (1.0 - t) * a_g[g] + t * a_g[g + 1]
        };
        let rhs = |r: f64, u: f64| -> f64 {
            let v = sample(vr_g, r) / r;
            (l * (l + 1.0) / (r * r) + 2.0 * (v - e)) * u
        };

        let kappa = (2.0 * (-e).max(1e-6)).sqrt();
        let mut u = 1e-12;
        let mut p = -kappa * u;
        u_g[gstart] = u;

        for g in (gmin..gstart).rev() {
            let ra = rgd.r_g[g + 1];
            let rb = rgd.r_g[g];
            let dr = rb - ra; // negative
            let k2 = (l * (l + 1.0) / (rb * rb) + 2.0 * (sample(vr_g, rb) / rb - e).abs()).abs();
            let nsub = ((dr.abs() * k2.sqrt() / 0.02).ceil() as usize).clamp(2, 2000);
            let h = dr / nsub as f64;
            for i in 0..nsub {
                let r = ra + i as f64 * h;
                let k1u = p;
                let k1p = rhs(r, u);
                let k2u = p + 0.5 * h * k1p;
                let k2p = rhs(r + 0.5 * h, u + 0.5 * h * k1u);
                let k3u = p + 0.5 * h * k2p;
                let k3p = rhs(r + 0.5 * h, u + 0.5 * h * k2u);
                let k4u = p + h * k3p;
                let k4p = rhs(r + h, u + h * k3u);
                u += h / 6.0 * (k1u + 2.0 * k2u + 2.0 * k3u + k4u);
                p += h / 6.0 * (k1p + 2.0 * k2p + 2.0 * k3p + k4p);
            }
            u_g[g] = u;
            if u.abs() > 1e250 {
                for v in u_g.iter_mut().skip(g).take(gstart - g + 1) {
                    *v *= 1e-250;
                }
                u *= 1e-250;
                p *= 1e-250;
            }
        }
        Ok(p)
    }

    /// Refine one bound-state energy by outward/inward matching.
    ///
    /// Starting from `e0`, Newton-iterates the logarithmic-derivative
    /// mismatch at the classical turning point; returns the energy and
    /// the normalized wavefunction phi.
    #[allow(clippy::too_many_arguments)]
    pub fn shoot_state(
        &self,
        rgd: &RadialGrid,
        vr_g: &Array1<f64>,
        e0: f64,
        scalar_relativistic: bool,
        z: f64,
    ) -> Result<(f64, Array1<f64>)> {
        let mut e = e0;
        let l = self.l as f64;

        for _iter in 0..100 {
            // Outermost classical turning point
            let mut gmatch = 10;
            for g in 10..rgd.len() - 10 {
                let r = rgd.r_g[g];
                let veff = vr_g[g] / r + 0.5 * l * (l + 1.0) / (r * r);
                if veff < e {
                    gmatch = g;
                }
            }
            gmatch = gmatch.clamp(10, rgd.len() - 20);

            // Start the inward integration where the decaying tail has
            // fallen by ~ exp(-35)
            let kappa = (2.0 * (-e).max(1e-3)).sqrt();
            let rfar = rgd.r_g[gmatch] + 35.0 / kappa;
            let gfar = rgd.ceil(rfar).min(rgd.len() - 2);

            let mut u_g = rgd.zeros();
            let (duo, _) = self.integrate_outwards(
                &mut u_g,
                rgd,
                vr_g,
                gmatch,
                e,
                scalar_relativistic,
                z,
                None,
            )?;
            let uo = u_g[gmatch];
            let mut ui_g = rgd.zeros();
            let dui = self.integrate_inwards(&mut ui_g, rgd, vr_g, gmatch, e, gfar)?;
            let ui = ui_g[gmatch];
            if uo == 0.0 || ui == 0.0 {
                return Err(AtomError::Integration(
                    "matching point fell on a node".to_string(),
                ));
            }

            // Stitch the two solutions together
            let factor = uo / ui;
            for g in gmatch..=gfar {
                u_g[g] = ui_g[g] * factor;
            }
            let mut norm = 0.0;
            for g in 1..=gfar {
                norm += u_g[g] * u_g[g] * rgd.dr_g[g];
            }

            let delta = duo / uo - dui * factor / uo;
            let de = 0.5 * delta * uo * uo / norm;
            e += de;
            if e > -1e-9 {
                e = -1e-9;
            }

            if de.abs() < 1e-11 * e.abs().max(1e-3) {
                // Normalize to ∫ phi² r² dr = 1 and convert u -> phi
                let scale = 1.0 / norm.sqrt();
                let mut phi_g = rgd.zeros();
                for g in 1..rgd.len() {
                    phi_g[g] = scale * u_g[g] / rgd.r_g[g];
                }
                phi_g[0] = if self.l == 0 {
                    // Quadratic extrapolation to the origin
                    2.0 * phi_g[1] - phi_g[2]
                } else {
                    0.0
                };
                if phi_g[rgd.len() / 16] < 0.0 {
                    phi_g.mapv_inplace(|x| -x);
                }
                return Ok((e, phi_g));
            }
        }
        Err(AtomError::NotConverged(format!(
            "shooting for l={} did not settle (e = {:.6})",
            self.l, e
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_outward_integration_hydrogen_1s() {
        // For e = -0.5 the hydrogen 1s u(r) = r exp(-r) solves the radial
        // equation; check the shape against the integrated solution.
        let rgd = RadialGrid::new(0.4, 600);
        let vr_g = Array1::from_elem(rgd.len(), -1.0);
        let ch = Channel::new(0);
        let mut u_g = rgd.zeros();
        let gmax = rgd.ceil(4.0);
        ch.integrate_outwards(&mut u_g, &rgd, &vr_g, gmax, -0.5, false, 1.0, None)
            .unwrap();
        let gref = rgd.ceil(1.0);
        let ratio = u_g[gref] / (rgd.r_g[gref] * (-rgd.r_g[gref]).exp());
        for g in (20..gmax).step_by(30) {
            let exact = rgd.r_g[g] * (-rgd.r_g[g]).exp();
            assert_relative_eq!(u_g[g], ratio * exact, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_shoot_hydrogen_states() {
        let rgd = RadialGrid::new(0.4, 600);
        let vr_g = Array1::from_elem(rgd.len(), -1.0);
        let ch = Channel::new(0);
        let (e1s, phi_g) = ch.shoot_state(&rgd, &vr_g, -0.45, false, 1.0).unwrap();
        assert_relative_eq!(e1s, -0.5, epsilon = 1e-6);
        // Normalization
        let norm = rgd.integrate(&phi_g.mapv(|x| x * x), 0) / (4.0 * PI);
        assert_relative_eq!(norm, 1.0, epsilon = 1e-6);

        let ch1 = Channel::new(1);
        let (e2p, _) = ch1.shoot_state(&rgd, &vr_g, -0.11, false, 1.0).unwrap();
        assert_relative_eq!(e2p, -0.125, epsilon = 1e-6);
    }

    #[test]
    fn test_scalar_relativistic_lowers_1s() {
        // Relativistic corrections deepen s states; for Z = 20 the shift
        // of the 1s level in a pure Coulomb potential is about
        // Z⁴ alpha² / 8 * (4n - 3) ... just check the sign and rough size.
        let rgd = RadialGrid::new(0.4, 800);
        let z = 20.0;
        let vr_g = Array1::from_elem(rgd.len(), -z);
        let ch = Channel::new(0);
        let e0 = -0.5 * z * z;
        let (enr, _) = ch.shoot_state(&rgd, &vr_g, e0 * 1.01, false, z).unwrap();
        let (erel, _) = ch.shoot_state(&rgd, &vr_g, e0 * 1.01, true, z).unwrap();
        assert_relative_eq!(enr, e0, max_relative = 1e-4);
        assert!(erel < enr);
        assert!(erel - enr > -0.5);
    }
}
