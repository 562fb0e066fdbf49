/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Partial waves, pseudo waves and projectors of one channel
//!
//! For each angular momentum the generator collects the all-electron
//! partial waves, pseudizes them and derives the projector functions and
//! the overlap/Hamiltonian correction matrices.

use super::errors::{GeneratorError, Result};
use crate::radial::RadialGrid;
use crate::utils::linear_algebra::invert;
use faer::Mat;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// How pseudo partial waves are constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudizeKind {
    /// Plain even-polynomial matching
    Poly,
    /// Norm-conserving matching
    NormConserving,
}

/// Partial waves of one angular-momentum channel
pub struct PAWWaves {
    /// Angular momentum
    pub l: usize,
    /// Cutoff radius for the pseudo waves
    pub rcut: f64,
    /// Principal quantum numbers; -1 marks unbound waves
    pub n_n: Vec<i32>,
    /// Reference energies
    pub e_n: Vec<f64>,
    /// Occupations
    pub f_n: Vec<f64>,
    /// All-electron partial waves phi
    pub phi_ng: Vec<Array1<f64>>,
    /// Pseudo partial waves phit (filled by pseudize)
    pub phit_ng: Vec<Array1<f64>>,
    /// Projector functions pt (filled by pseudize)
    pub pt_ng: Vec<Array1<f64>>,
    /// Pseudo valence density of this channel
    pub nt_g: Array1<f64>,
    /// Overlap correction dS = (<phi|phi> - <phit|phit>) / 4 pi
    pub ds_nn: Array2<f64>,
    /// Hamiltonian correction
    pub dh_nn: Array2<f64>,
    /// Kinetic-energy correction (filled last)
    pub dekin_nn: Array2<f64>,
    /// Compensation charge carried by this channel
    pub q: f64,
}

impl PAWWaves {
    pub fn new(rgd: &RadialGrid, l: usize, rcut: f64) -> Self {
        PAWWaves {
            l,
            rcut,
            n_n: Vec::new(),
            e_n: Vec::new(),
            f_n: Vec::new(),
            phi_ng: Vec::new(),
            phit_ng: Vec::new(),
            pt_ng: Vec::new(),
            nt_g: rgd.zeros(),
            ds_nn: Array2::zeros((0, 0)),
            dh_nn: Array2::zeros((0, 0)),
            dekin_nn: Array2::zeros((0, 0)),
            q: 0.0,
        }
    }

    /// Number of waves in the channel
    pub fn len(&self) -> usize {
        self.n_n.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_n.is_empty()
    }

    /// Add one all-electron partial wave
    pub fn add(&mut self, phi_g: Array1<f64>, n: i32, e: f64, f: f64) {
        self.phi_ng.push(phi_g);
        self.n_n.push(n);
        self.e_n.push(e);
        self.f_n.push(f);
    }

    /// Pseudize all waves of the channel and derive the projectors.
    ///
    /// Each pseudo wave phit replaces phi inside rcut; the projector
    /// follows from the defining relation (T + vt - e) phit = -pt, and
    /// the set is biorthogonalized so that <pt_n | phit_m> = delta_nm.
    ///
    /// # Arguments
    ///
    /// * `rgd` - Radial grid
    /// * `kind` - Polynomial or norm-conserving pseudization
    /// * `nderiv` - Number of polynomial coefficients
    /// * `vtr_g` - Smooth local potential as r vt(r)
    /// * `rcmax` - Radius beyond which raw projectors are truncated
    pub fn pseudize(
        &mut self,
        rgd: &RadialGrid,
        kind: PseudizeKind,
        nderiv: usize,
        vtr_g: &Array1<f64>,
        rcmax: f64,
    ) -> Result<()> {
        let nwaves = self.len();
        let l = self.l;
        let gc = rgd.ceil(self.rcut);
        let gcmax = rgd.ceil(rcmax);

        let dgdr_g: Array1<f64> = rgd.dr_g.mapv(|dr| 1.0 / dr);
        let d2gdr2_g = rgd.d2gdr2();

        self.phit_ng.clear();
        self.pt_ng.clear();
        self.nt_g = rgd.zeros();

        for n in 0..nwaves {
            let (phit_g, c0) = match kind {
                PseudizeKind::Poly => rgd.pseudize(&self.phi_ng[n], gc, l, nderiv)?,
                PseudizeKind::NormConserving => {
                    rgd.pseudize_normalized(&self.phi_ng[n], gc, l, nderiv)?
                }
            };

            // a = phit / r^l and its index-space derivatives
            let ng = rgd.len();
            let mut a_g = rgd.zeros();
            for g in 1..ng {
                a_g[g] = phit_g[g] / rgd.r_g[g].powi(l as i32);
            }
            a_g[0] = c0;
            let mut dadg_g = rgd.zeros();
            let mut d2adg2_g = rgd.zeros();
            for g in 1..ng - 1 {
                dadg_g[g] = 0.5 * (a_g[g + 1] - a_g[g - 1]);
                d2adg2_g[g] = a_g[g + 1] - 2.0 * a_g[g] + a_g[g - 1];
            }

            // Raw projector from the defining relation
            let mut q_g = rgd.zeros();
            for g in 0..ng {
                q_g[g] = (vtr_g[g] - self.e_n[n] * rgd.r_g[g]) * phit_g[g];
                q_g[g] -= 0.5
                    * rgd.r_g[g].powi(l as i32)
                    * ((2.0 * (l as f64 + 1.0) * dgdr_g[g] + rgd.r_g[g] * d2gdr2_g[g])
                        * dadg_g[g]
                        + rgd.r_g[g] * d2adg2_g[g] * dgdr_g[g] * dgdr_g[g]);
            }
            for g in gcmax..ng {
                q_g[g] = 0.0;
            }
            rgd.cut(&mut q_g, self.rcut);
            for g in 1..ng {
                q_g[g] /= rgd.r_g[g];
            }
            if l == 0 {
                q_g[0] = q_g[1];
            } else {
                q_g[0] = 0.0;
            }

            self.nt_g
                .scaled_add(self.f_n[n] / (4.0 * PI), &phit_g.mapv(|x| x * x));
            self.phit_ng.push(phit_g);
            self.pt_ng.push(q_g);
        }

        // Overlap and Hamiltonian corrections
        self.ds_nn = (rgd.integrate_pairs(&self.phi_ng, &self.phi_ng)
            - rgd.integrate_pairs(&self.phit_ng, &self.phit_ng))
            / (4.0 * PI);
        self.q = self
            .f_n
            .iter()
            .enumerate()
            .map(|(n, f)| f * self.ds_nn[(n, n)])
            .sum();

        let a_nn = rgd.integrate_pairs(&self.phit_ng, &self.pt_ng) / (4.0 * PI);
        let mut dh_nn = Array2::zeros((nwaves, nwaves));
        for n1 in 0..nwaves {
            for n2 in 0..nwaves {
                dh_nn[(n1, n2)] = self.ds_nn[(n1, n2)] * self.e_n[n2] - a_nn[(n1, n2)];
            }
        }
        // Symmetrize
        let mut sym_nn = Array2::zeros((nwaves, nwaves));
        for n1 in 0..nwaves {
            for n2 in 0..nwaves {
                sym_nn[(n1, n2)] = 0.5 * (dh_nn[(n1, n2)] + dh_nn[(n2, n1)]);
            }
        }
        self.dh_nn = sym_nn;

        // Biorthogonalize the projectors: pt <- inv(A^T) pt
        let mut at = Mat::<f64>::zeros(nwaves, nwaves);
        for n1 in 0..nwaves {
            for n2 in 0..nwaves {
                at[(n1, n2)] = a_nn[(n2, n1)];
            }
        }
        let inv_at = invert(&at).map_err(|err| {
            GeneratorError::DatasetGeneration(format!(
                "projector-overlap matrix for l={} not invertible: {}",
                self.l, err
            ))
        })?;
        let old_pt: Vec<Array1<f64>> = std::mem::take(&mut self.pt_ng);
        for n1 in 0..nwaves {
            let mut pt_g = rgd.zeros();
            for (n2, pt_old) in old_pt.iter().enumerate() {
                pt_g.scaled_add(inv_at[(n1, n2)], pt_old);
            }
            self.pt_ng.push(pt_g);
        }
        Ok(())
    }

    /// Kinetic-energy correction matrix, using the potentials the waves
    /// were generated in
    pub fn calculate_kinetic_energy_correction(
        &mut self,
        rgd: &RadialGrid,
        vr_g: &Array1<f64>,
        vtr_g: &Array1<f64>,
    ) {
        let nwaves = self.len();
        if nwaves == 0 {
            self.dekin_nn = Array2::zeros((0, 0));
            return;
        }
        let mut dekin_nn = Array2::zeros((nwaves, nwaves));
        for n1 in 0..nwaves {
            for n2 in 0..nwaves {
                let tt = rgd.integrate(
                    &(&self.phit_ng[n1] * &self.phit_ng[n2] * vtr_g),
                    -1,
                ) / (4.0 * PI);
                let aa = rgd.integrate(&(&self.phi_ng[n1] * &self.phi_ng[n2] * vr_g), -1)
                    / (4.0 * PI);
                dekin_nn[(n1, n2)] = tt - aa + self.dh_nn[(n1, n2)];
            }
        }
        self.dekin_nn = dekin_nn;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_channel() {
        let rgd = RadialGrid::new(0.4, 300);
        let mut waves = PAWWaves::new(&rgd, 2, 1.0);
        assert!(waves.is_empty());
        let vtr_g = rgd.zeros();
        waves.calculate_kinetic_energy_correction(&rgd, &vtr_g, &vtr_g);
        assert_eq!(waves.dekin_nn.dim(), (0, 0));
    }
}
