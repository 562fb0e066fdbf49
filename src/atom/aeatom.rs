/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! All-electron reference atom
//!
//! Solves the spherical spin-paired Kohn-Sham problem for an isolated
//! atom on the logarithmic radial grid.  The channels are diagonalized in
//! a Gaussian basis; a scalar-relativistic refinement re-solves the bound
//! states by direct radial integration.  The result (orbital energies,
//! wavefunctions, densities, potential and total-energy terms) is the
//! reference every PAW dataset is generated against.

use super::channel::Channel;
use super::configurations::{atomic_number, configuration, CHEMICAL_SYMBOLS};
use super::errors::{AtomError, Result};
use super::gaussian::{exponent_ladder, GaussianBasis};
use crate::radial::RadialGrid;
use crate::xc::XCKernel;
use log::{debug, info, warn};
use ndarray::Array1;
use std::f64::consts::PI;

/// Number of points on the radial grid
const NGPTS: usize = 600;
/// Number of Gaussian primitives per channel
const NGAUSS: usize = 80;
/// Linear density-mixing weight
const MIX: f64 = 0.4;

/// The all-electron atom
pub struct AllElectronAtom {
    /// Chemical symbol
    pub symbol: String,
    /// Nuclear charge
    pub z: f64,
    /// Exchange-correlation kernel
    pub xc: XCKernel,
    /// Radial grid shared by all atomic quantities
    pub rgd: RadialGrid,
    /// Channels, indexed by angular momentum
    pub channels: Vec<Channel>,
    /// Gaussian bases, one per channel
    pub basis_l: Vec<GaussianBasis>,
    /// Total electron density
    pub n_g: Array1<f64>,
    /// Effective potential as r v(r)
    pub vr_g: Array1<f64>,
    /// Solve bound states with the scalar-relativistic radial equation
    pub scalar_relativistic: bool,
    /// Kinetic energy
    pub ekin: f64,
    /// Hartree energy
    pub eh: f64,
    /// Electron-nucleus energy
    pub ez: f64,
    /// Exchange-correlation energy
    pub exc: f64,
    /// Total energy
    pub etot: f64,
    initialized: bool,
}

impl AllElectronAtom {
    /// Create an atom in its ground-state configuration.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Chemical symbol
    /// * `xc` - Functional name handed to [`XCKernel::new`]
    pub fn new(symbol: &str, xc: &str) -> Result<Self> {
        let z = atomic_number(symbol)?;
        let mut channels: Vec<Channel> = Vec::new();
        for (n, l, f) in configuration(z)? {
            while channels.len() <= l {
                let ll = channels.len();
                channels.push(Channel::new(ll));
            }
            let j = n - l - 1;
            if channels[l].f_n.len() <= j {
                channels[l].f_n.resize(j + 1, 0.0);
            }
            channels[l].f_n[j] = f;
        }
        let rgd = RadialGrid::new(0.4, NGPTS);
        let n_g = rgd.zeros();
        let vr_g = Array1::from_elem(rgd.len(), -(z as f64));
        Ok(AllElectronAtom {
            symbol: symbol.to_string(),
            z: z as f64,
            xc: XCKernel::new(xc)?,
            rgd,
            channels,
            basis_l: Vec::new(),
            n_g,
            vr_g,
            scalar_relativistic: false,
            ekin: 0.0,
            eh: 0.0,
            ez: 0.0,
            exc: 0.0,
            etot: 0.0,
            initialized: false,
        })
    }

    /// Element symbol for an atomic number
    pub fn symbol_of(z: usize) -> &'static str {
        CHEMICAL_SYMBOLS[z]
    }

    /// Adjust the occupation of state (n, l) by `df` electrons.
    ///
    /// Creates the channel and the state if they do not exist yet; used
    /// for core holes and for registering empty bound states that the
    /// dataset generator needs eigenvalues for.
    pub fn add(&mut self, n: usize, l: usize, df: f64) -> Result<()> {
        if n < l + 1 {
            return Err(AtomError::InvalidConfiguration(format!(
                "state n={} l={} does not exist",
                n, l
            )));
        }
        while self.channels.len() <= l {
            let ll = self.channels.len();
            self.channels.push(Channel::new(ll));
        }
        let j = n - l - 1;
        if self.channels[l].f_n.len() <= j {
            self.channels[l].f_n.resize(j + 1, 0.0);
        }
        self.channels[l].f_n[j] += df;
        if self.channels[l].f_n[j] < 0.0 {
            return Err(AtomError::InvalidConfiguration(format!(
                "negative occupation for n={} l={}",
                n, l
            )));
        }
        self.initialized = false;
        Ok(())
    }

    /// Number of bound states registered for channel l
    pub fn nstates(&self, l: usize) -> usize {
        self.channels.get(l).map_or(0, |ch| ch.f_n.len())
    }

    /// Build the Gaussian bases.  Must be called before
    /// [`AllElectronAtom::run`] and again after occupations changed.
    pub fn initialize(&mut self) -> Result<()> {
        let alpha_min = 0.01;
        let alpha_max = 50.0 * self.z * self.z;
        let alpha_b = exponent_ladder(alpha_min, alpha_max, NGAUSS);
        self.basis_l.clear();
        for l in 0..self.channels.len() {
            self.basis_l
                .push(GaussianBasis::new(l, &alpha_b, &self.rgd, 1e-8)?);
        }
        self.initialized = true;
        Ok(())
    }

    fn solve_channels(&mut self) -> Result<()> {
        for (l, ch) in self.channels.iter_mut().enumerate() {
            ch.solve(&self.basis_l[l], &self.rgd, &self.vr_g)?;
        }
        Ok(())
    }

    fn density_from_channels(&self) -> Array1<f64> {
        let mut n_g = self.rgd.zeros();
        for ch in &self.channels {
            for (j, &f) in ch.f_n.iter().enumerate() {
                if f > 0.0 {
                    n_g += &(ch.calculate_density(j) * f);
                }
            }
        }
        n_g
    }

    /// Electrostatic and xc potential of a given density; returns
    /// (vr_g, eh, ez, exc)
    fn effective_potential(&self, n_g: &Array1<f64>) -> (Array1<f64>, f64, f64, f64) {
        let vhr_g = self.rgd.poisson(n_g, 0);
        let mut vxc_g = self.rgd.zeros();
        let exc = self.xc.calculate_spherical(&self.rgd, n_g, &mut vxc_g);
        let mut vr_g = self.rgd.zeros();
        for g in 0..self.rgd.len() {
            vr_g[g] = vhr_g[g] + vxc_g[g] * self.rgd.r_g[g] - self.z;
        }
        let eh = 0.5 * self.rgd.integrate(&(n_g * &vhr_g), -1);
        let ez = -self.z * self.rgd.integrate(n_g, -1);
        (vr_g, eh, ez, exc)
    }

    /// Run the self-consistency loop.
    pub fn run(&mut self) -> Result<()> {
        if !self.initialized {
            self.initialize()?;
        }
        let mut etot_old = f64::MAX;
        for iteration in 0..200 {
            self.solve_channels()?;
            let n_new = self.density_from_channels();

            // Band-structure energy minus double counting
            let mut eband = 0.0;
            for ch in &self.channels {
                for (j, &f) in ch.f_n.iter().enumerate() {
                    eband += f * ch.e_n[j];
                }
            }
            self.ekin = eband - self.rgd.integrate(&(&n_new * &self.vr_g), -1);

            let mixed = if iteration == 0 {
                n_new
            } else {
                &n_new * MIX + &self.n_g * (1.0 - MIX)
            };
            self.n_g = mixed;

            let (vr_g, eh, ez, exc) = self.effective_potential(&self.n_g);
            self.vr_g = vr_g;
            self.eh = eh;
            self.ez = ez;
            self.exc = exc;
            self.etot = self.ekin + self.eh + self.ez + self.exc;

            let change = (self.etot - etot_old).abs();
            debug!(
                "SCF iteration {:3}: Etot = {:.9} Ha (change {:.2e})",
                iteration, self.etot, change
            );
            if change < 1e-9 && iteration > 3 {
                info!(
                    "{}: converged in {} iterations, Etot = {:.6} Ha",
                    self.symbol, iteration, self.etot
                );
                return Ok(());
            }
            etot_old = self.etot;
        }
        Err(AtomError::NotConverged(format!(
            "{} did not converge in 200 iterations",
            self.symbol
        )))
    }

    /// Refine the bound states by direct radial integration.
    ///
    /// With `scalar_relativistic` set this folds the relativistic
    /// corrections into the eigenvalues, wavefunctions and the density;
    /// otherwise it is a no-op beyond a final SCF tightening.
    pub fn refine(&mut self) -> Result<()> {
        if !self.scalar_relativistic {
            return self.run();
        }
        let mut etot_old = f64::MAX;
        for iteration in 0..80 {
            for l in 0..self.channels.len() {
                for j in 0..self.channels[l].f_n.len() {
                    let e0 = self.channels[l].e_n[j];
                    let (e, phi_g) = self.channels[l].shoot_state(
                        &self.rgd,
                        &self.vr_g,
                        e0,
                        true,
                        self.z,
                    )?;
                    self.channels[l].e_n[j] = e;
                    self.channels[l].phi_ng[j] = phi_g;
                }
            }
            let n_new = self.density_from_channels();
            let mut eband = 0.0;
            for ch in &self.channels {
                for (j, &f) in ch.f_n.iter().enumerate() {
                    eband += f * ch.e_n[j];
                }
            }
            self.ekin = eband - self.rgd.integrate(&(&n_new * &self.vr_g), -1);

            self.n_g = &n_new * MIX + &self.n_g * (1.0 - MIX);
            let (vr_g, eh, ez, exc) = self.effective_potential(&self.n_g);
            self.vr_g = vr_g;
            self.eh = eh;
            self.ez = ez;
            self.exc = exc;
            self.etot = self.ekin + self.eh + self.ez + self.exc;

            let change = (self.etot - etot_old).abs();
            debug!(
                "relativistic refinement {:3}: Etot = {:.9} Ha (change {:.2e})",
                iteration, self.etot, change
            );
            if change < 1e-8 && iteration > 3 {
                info!(
                    "{}: scalar-relativistic refinement done, Etot = {:.6} Ha",
                    self.symbol, self.etot
                );
                return Ok(());
            }
            etot_old = self.etot;
        }
        warn!(
            "{}: scalar-relativistic refinement stopped at change {:.1e}",
            self.symbol,
            (self.etot - etot_old).abs()
        );
        Ok(())
    }

    /// Total number of electrons
    pub fn nelectrons(&self) -> f64 {
        self.channels
            .iter()
            .flat_map(|ch| ch.f_n.iter())
            .sum::<f64>()
    }

    /// Logarithmic derivatives arctan(d ln u / dr) / pi at `rcut` for a
    /// range of energies
    pub fn logarithmic_derivative(
        &self,
        l: usize,
        energies: &[f64],
        rcut: f64,
    ) -> Result<Vec<f64>> {
        let ch = Channel::new(l);
        let gcut = self.rgd.round(rcut);
        let mut ld = Vec::with_capacity(energies.len());
        let mut d0 = 42.0;
        let mut offset = 0.0;
        for &e in energies {
            let mut u_g = self.rgd.zeros();
            let (dudr, _) = ch.integrate_outwards(
                &mut u_g,
                &self.rgd,
                &self.vr_g,
                gcut,
                e,
                self.scalar_relativistic,
                self.z,
                None,
            )?;
            let mut d1 = (dudr / u_g[gcut]).atan() / PI + offset;
            if d1 > d0 {
                offset -= 1.0;
                d1 -= 1.0;
            }
            ld.push(d1);
            d0 = d1;
        }
        Ok(ld)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hydrogen_ground_state() {
        let mut atom = AllElectronAtom::new("H", "LDA").unwrap();
        atom.run().unwrap();
        // LDA hydrogen: e_1s = -0.2338 Ha, Etot = -0.4457 Ha
        assert_relative_eq!(atom.channels[0].e_n[0], -0.2338, epsilon = 2e-3);
        assert_relative_eq!(atom.etot, -0.4457, epsilon = 2e-3);
        assert_relative_eq!(atom.nelectrons(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_oxygen_scf() {
        let mut atom = AllElectronAtom::new("O", "LDA").unwrap();
        atom.run().unwrap();
        // Known LDA (PW92) eigenvalues for spherical O: 1s = -18.758,
        // 2s = -0.871, 2p = -0.338 Ha
        assert_relative_eq!(atom.channels[0].e_n[0], -18.758, epsilon = 0.05);
        assert_relative_eq!(atom.channels[0].e_n[1], -0.871, epsilon = 0.01);
        assert_relative_eq!(atom.channels[1].e_n[0], -0.338, epsilon = 0.01);
        // Density integrates to 8 electrons
        let nel = atom.rgd.integrate(&atom.n_g, 0);
        assert_relative_eq!(nel, 8.0, epsilon = 1e-6);
    }
}
