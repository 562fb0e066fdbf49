/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! PAW dataset generator
//!
//! Drives the end-to-end construction of one element's PAW dataset from
//! the all-electron reference atom.  The stages must run in order:
//!
//! construct_shape_function -> calculate_core_density ->
//! find_local_potential -> add_waves -> pseudize ->
//! construct_projectors -> (calculate_exx_integrals) -> make_paw_setup
//!
//! Each stage stores what the next one consumes; entering a stage before
//! its prerequisites is a caller error and fails with `StageOrder`.

use super::errors::{GeneratorError, Result};
use super::waves::{PAWWaves, PseudizeKind};
use crate::atom::{AllElectronAtom, Channel, GaussianBasis};
use crate::gaunt::gaunt;
use crate::radial::RadialGrid;
use crate::setup::data::SetupData;
use crate::utils::constants::HARTREE_TO_EV;
use crate::utils::linear_algebra::{general_diagonalize, solve_vec};
use crate::utils::math::erf;
use crate::utils::{pack, UtilsError};
use faer::Mat;
use log::{info, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::f64::consts::PI;

/// One projector of the specification string
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateSpec {
    /// Bound state with principal quantum number n
    Bound(usize),
    /// Unbound wave at an explicit energy (Hartree)
    Energy(f64),
    /// Unbound wave one Hartree above the previous wave of the channel
    Free,
}

/// Parsed projector specification
pub struct ProjectorSpec {
    /// States per angular momentum
    pub states: Vec<Vec<StateSpec>>,
    /// Highest angular momentum with projectors
    pub lmax: Option<usize>,
    /// Channel used for local-potential matching, if requested by a
    /// trailing capital letter
    pub l0: Option<usize>,
}

/// Parse a specification like "2s,s,2p,p,d,F"
pub fn parse_projectors(projectors: &str) -> Result<ProjectorSpec> {
    let mut text = projectors.trim();
    let mut l0 = None;
    if let Some(last) = text.chars().last() {
        if last.is_ascii_uppercase() {
            l0 = Some("SPDFG".find(last).ok_or_else(|| {
                GeneratorError::InvalidProjectors(projectors.to_string())
            })?);
            text = text[..text.len() - 2].trim_end();
        }
    }

    let mut states: Vec<Vec<StateSpec>> = Vec::new();
    let mut lmax = None;
    for token in text.split(',') {
        let token = token.trim();
        let l = "spdf"
            .find(token.chars().last().ok_or_else(|| {
                GeneratorError::InvalidProjectors(projectors.to_string())
            })?)
            .ok_or_else(|| GeneratorError::InvalidProjectors(projectors.to_string()))?;
        let prefix = &token[..token.len() - 1];
        let spec = if prefix.is_empty() {
            StateSpec::Free
        } else if prefix.contains('.') {
            StateSpec::Energy(prefix.parse().map_err(|_| {
                GeneratorError::InvalidProjectors(projectors.to_string())
            })?)
        } else {
            let n: usize = prefix.parse().map_err(|_| {
                GeneratorError::InvalidProjectors(projectors.to_string())
            })?;
            if n < l + 1 {
                return Err(GeneratorError::InvalidProjectors(projectors.to_string()));
            }
            StateSpec::Bound(n)
        };
        while states.len() <= l {
            states.push(Vec::new());
        }
        states[l].push(spec);
        lmax = Some(lmax.map_or(l, |m: usize| m.max(l)));
    }
    Ok(ProjectorSpec { states, lmax, l0 })
}

/// The PAW dataset generator
pub struct PAWSetupGenerator {
    /// The all-electron reference atom
    pub aea: AllElectronAtom,
    /// Radial grid (shared with the atom)
    pub rgd: RadialGrid,
    /// Projector states per angular momentum
    pub states: Vec<Vec<StateSpec>>,
    /// Highest projector angular momentum (None when only a local
    /// potential is generated)
    pub lmax: Option<usize>,
    /// Channel for zero-energy scattering matching of the local potential
    pub l0: Option<usize>,
    /// Core hole (n, l, occupation removed)
    pub core_hole: Option<(usize, usize, f64)>,
    /// Separation parameter for screened-exchange integrals
    pub yukawa_gamma: f64,

    /// Shape-function decay constant (Bohr^-2)
    pub alpha: Option<f64>,
    /// Compensation-charge shape function
    pub ghat_g: Option<Array1<f64>>,

    /// Frozen-core density
    pub nc_g: Option<Array1<f64>>,
    /// Frozen-core kinetic-energy density
    pub tauc_g: Option<Array1<f64>>,
    /// Number of core electrons
    pub ncore: f64,
    /// Number of valence electrons
    pub nvalence: f64,
    /// Kinetic energy of the core
    pub ekincore: f64,

    /// Smooth local potential as r vt(r)
    pub vtr_g: Option<Array1<f64>>,
    /// Matching radius of the local potential
    pub r0: f64,
    /// Number of polynomial terms of the local potential
    pub nderiv0: usize,

    /// Waves per angular momentum
    pub waves_l: Vec<PAWWaves>,
    /// Largest wave cutoff radius
    pub rcmax: f64,

    /// Pseudo valence (+ core) density
    pub nt_g: Option<Array1<f64>>,
    /// Pseudo core density
    pub nct_g: Option<Array1<f64>>,
    /// Pseudo core kinetic-energy density
    pub tauct_g: Option<Array1<f64>>,
    /// Total compensation charge
    pub q: f64,
    /// Integral of the pseudo core density
    pub npseudocore: f64,

    /// Pseudo charge density including compensation charge
    pub rhot_g: Option<Array1<f64>>,
    /// Hartree potential of rhot as r vH(r)
    pub vhtr_g: Option<Array1<f64>>,
    /// XC potential of the pseudo density
    pub vxct_g: Option<Array1<f64>>,
    /// XC energy of the pseudo density
    pub exct: f64,
    /// Zero-potential remainder as r v0(r)
    pub v0r_g: Option<Array1<f64>>,

    /// Core-core exact-exchange energy
    pub exxcc: f64,
    /// Core-valence exact-exchange matrix
    pub exxcv_ii: Option<Array2<f64>>,
    /// Screened core-valence exchange matrix
    pub exxgcv_ii: Option<Array2<f64>>,
}

impl PAWSetupGenerator {
    /// Set up the generator: parse the projector specification, register
    /// empty bound states and converge the reference atom.
    ///
    /// # Arguments
    ///
    /// * `aea` - All-electron atom (will be solved here)
    /// * `projectors` - Specification like "2s,s,2p,p,d,F"
    /// * `scalar_relativistic` - Use the scalar-relativistic atom
    /// * `core_hole` - Optional "1s,0.5"-style core-hole specification
    /// * `yukawa_gamma` - Separation parameter for screened exchange
    pub fn new(
        mut aea: AllElectronAtom,
        projectors: &str,
        scalar_relativistic: bool,
        core_hole: Option<&str>,
        yukawa_gamma: f64,
    ) -> Result<Self> {
        let core_hole = match core_hole {
            Some(text) => {
                let (state, occ) = text.split_once(',').ok_or_else(|| {
                    GeneratorError::InvalidProjectors(format!("core hole '{}'", text))
                })?;
                let mut chars = state.chars();
                let n: usize = chars
                    .next()
                    .and_then(|c| c.to_digit(10))
                    .ok_or_else(|| {
                        GeneratorError::InvalidProjectors(format!("core hole '{}'", text))
                    })? as usize;
                let l = "spdf".find(chars.next().unwrap_or('?')).ok_or_else(|| {
                    GeneratorError::InvalidProjectors(format!("core hole '{}'", text))
                })?;
                let occ: f64 = occ.parse().map_err(|_| {
                    GeneratorError::InvalidProjectors(format!("core hole '{}'", text))
                })?;
                aea.add(n, l, -occ)?;
                Some((n, l, occ))
            }
            None => None,
        };

        let spec = parse_projectors(projectors)?;

        // Register empty bound states so the atom provides eigenvalues
        // and wavefunctions for them
        for (l, specs) in spec.states.iter().enumerate() {
            for s in specs {
                if let StateSpec::Bound(n) = s {
                    if *n - l > aea.nstates(l) {
                        aea.add(*n, l, 0.0)?;
                    }
                }
            }
        }

        aea.initialize()?;
        aea.run()?;
        aea.scalar_relativistic = scalar_relativistic;
        aea.refine()?;

        let rgd = aea.rgd.clone();
        info!(
            "Generating PAW {} setup for {}",
            aea.xc.name(),
            aea.symbol
        );

        Ok(PAWSetupGenerator {
            aea,
            rgd,
            states: spec.states,
            lmax: spec.lmax,
            l0: spec.l0,
            core_hole,
            yukawa_gamma,
            alpha: None,
            ghat_g: None,
            nc_g: None,
            tauc_g: None,
            ncore: 0.0,
            nvalence: 0.0,
            ekincore: 0.0,
            vtr_g: None,
            r0: 0.0,
            nderiv0: 0,
            waves_l: Vec::new(),
            rcmax: 0.0,
            nt_g: None,
            nct_g: None,
            tauct_g: None,
            q: 0.0,
            npseudocore: 0.0,
            rhot_g: None,
            vhtr_g: None,
            vxct_g: None,
            exct: 0.0,
            v0r_g: None,
            exxcc: 0.0,
            exxcv_ii: None,
            exxgcv_ii: None,
        })
    }

    /// Build the compensation-charge shape function.
    ///
    /// The Gaussian decay constant is either given or chosen so that the
    /// fraction of the charge outside 1.5 rc stays below `eps`.
    pub fn construct_shape_function(
        &mut self,
        alpha: Option<f64>,
        radii: &[f64],
        eps: f64,
    ) -> Result<()> {
        let alpha = match alpha {
            Some(a) => a,
            None => {
                let rc = 1.5
                    * radii
                        .iter()
                        .cloned()
                        .fold(f64::INFINITY, f64::min);
                let spillage = |a: f64| {
                    let x = a * rc * rc;
                    1.0 - erf(x.sqrt()) + 2.0 * (x / PI).sqrt() * (-x).exp()
                };
                let target = eps.ln();
                // Secant iteration on log(spillage) - log(eps)
                let mut a0 = 7.0;
                let mut a1 = 8.0;
                let mut f0 = spillage(a0).ln() - target;
                for _ in 0..100 {
                    let f1 = spillage(a1).ln() - target;
                    if (a1 - a0).abs() < 1e-10 || f1 == f0 {
                        break;
                    }
                    let a2 = a1 - f1 * (a1 - a0) / (f1 - f0);
                    a0 = a1;
                    f0 = f1;
                    a1 = a2.max(0.1);
                }
                (a1 * 10.0).round() / 10.0
            }
        };

        info!(
            "Shape function: exp(-alpha*r^2), alpha={:.1} Bohr^-2",
            alpha
        );
        self.alpha = Some(alpha);
        self.ghat_g = Some(
            self.rgd
                .r_g
                .mapv(|r| (alpha / PI).powf(1.5) * (-alpha * r * r).exp()),
        );
        Ok(())
    }

    /// Partition the atomic states into frozen core and valence and
    /// accumulate the core densities.
    pub fn calculate_core_density(&mut self) -> Result<()> {
        let mut nc_g = self.rgd.zeros();
        let mut tauc_g = self.rgd.zeros();
        self.ncore = 0.0;
        self.nvalence = 0.0;
        self.ekincore = 0.0;
        let lmax = self.lmax.map_or(-1, |l| l as i64);
        for (l, ch) in self.aea.channels.iter().enumerate() {
            for (j, &f) in ch.f_n.iter().enumerate() {
                let valence = (l as i64) <= lmax
                    && self.states[l]
                        .iter()
                        .any(|s| matches!(s, StateSpec::Bound(n) if *n == j + l + 1));
                if valence {
                    self.nvalence += f;
                } else {
                    nc_g += &(ch.calculate_density(j) * f);
                    tauc_g += &(ch.calculate_kinetic_energy_density(j, &self.rgd) * f);
                    self.ncore += f;
                    self.ekincore += f * ch.e_n[j];
                }
            }
        }
        self.ekincore -= self.rgd.integrate(&(&nc_g * &self.aea.vr_g), -1);
        info!("Core electrons: {}", self.ncore);
        info!("Valence electrons: {}", self.nvalence);
        self.nc_g = Some(nc_g);
        self.tauc_g = Some(tauc_g);
        Ok(())
    }

    /// Construct the smooth local potential inside r0.
    pub fn find_local_potential(&mut self, r0: f64, nderiv0: usize) -> Result<()> {
        self.r0 = r0;
        self.nderiv0 = nderiv0;
        match self.l0 {
            None => self.find_polynomial_potential(r0, nderiv0),
            Some(_) => self.match_local_potential(r0, nderiv0),
        }
    }

    fn find_polynomial_potential(&mut self, r0: f64, points: usize) -> Result<()> {
        info!("Constructing smooth local potential for r < {:.3}", r0);
        let g0 = self.rgd.ceil(r0);
        let (vtr_g, _) = self.rgd.pseudize(&self.aea.vr_g, g0, 1, points)?;
        self.vtr_g = Some(vtr_g);
        Ok(())
    }

    /// Local potential that reproduces zero-energy scattering exactly for
    /// the l0 channel.
    fn match_local_potential(&mut self, r0: f64, points: usize) -> Result<()> {
        let l0 = self.l0.expect("match_local_potential requires l0");
        info!(
            "Local potential matching {}-scattering at e=0.0 eV and r={:.2} Bohr",
            "spdfg".chars().nth(l0).unwrap(),
            r0
        );

        let g0 = self.rgd.ceil(r0);
        let gc = g0 + 20;
        let e0 = 0.0;

        let ch = Channel::new(l0);
        let mut phi_g = self.rgd.zeros();
        let (_, a) = ch.integrate_outwards(
            &mut phi_g,
            &self.rgd,
            &self.aea.vr_g,
            gc,
            e0,
            self.aea.scalar_relativistic,
            self.aea.z,
            None,
        )?;
        for g in 1..gc {
            phi_g[g] /= self.rgd.r_g[g];
        }
        phi_g[0] = a;

        let (phit_g, c) = self.rgd.pseudize(&phi_g, g0, l0, points)?;

        let dgdr_g: Array1<f64> = self.rgd.dr_g.mapv(|dr| 1.0 / dr);
        let d2gdr2_g = self.rgd.d2gdr2();
        let ng = self.rgd.len();
        let mut a_g = phit_g.clone();
        for g in 1..ng {
            a_g[g] /= self.rgd.r_g[g].powi(l0 as i32);
        }
        a_g[0] = c;
        let mut dadg_g = self.rgd.zeros();
        let mut d2adg2_g = self.rgd.zeros();
        for g in 1..ng - 1 {
            dadg_g[g] = 0.5 * (a_g[g + 1] - a_g[g - 1]);
            d2adg2_g[g] = a_g[g + 1] - 2.0 * a_g[g] + a_g[g - 1];
        }
        let mut q_g = self.rgd.zeros();
        for g in 0..ng {
            q_g[g] = ((l0 as f64 + 1.0) * dgdr_g[g] + 0.5 * self.rgd.r_g[g] * d2gdr2_g[g])
                * dadg_g[g]
                + 0.5 * self.rgd.r_g[g] * d2adg2_g[g] * dgdr_g[g] * dgdr_g[g];
        }
        for g in 0..g0 {
            q_g[g] /= a_g[g];
        }
        for g in 0..ng {
            q_g[g] += e0 * self.rgd.r_g[g];
        }
        q_g[0] = 0.0;

        let mut vtr_g = self.aea.vr_g.clone();
        vtr_g[0] = 0.0;
        for g in 1..g0 {
            vtr_g[g] = q_g[g];
        }
        self.vtr_g = Some(vtr_g);
        Ok(())
    }

    /// Instantiate the partial waves: bound states from the atom and
    /// unbound waves by outward integration at the requested energies.
    pub fn add_waves(&mut self, rc: &[f64]) -> Result<()> {
        let vr_g = self.aea.vr_g.clone();
        let lmax = match self.lmax {
            Some(l) => l,
            None => {
                self.rcmax = rc.iter().cloned().fold(0.0, f64::max);
                return Ok(());
            }
        };

        let mut radii: Vec<f64> = rc.to_vec();
        while radii.len() < lmax + 1 {
            radii.push(*radii.last().expect("at least one radius"));
        }
        radii.truncate(lmax + 1);
        self.rcmax = radii.iter().cloned().fold(0.0, f64::max);

        self.waves_l.clear();
        for l in 0..=lmax {
            let rcut = radii[l];
            let mut waves = PAWWaves::new(&self.rgd, l, rcut);
            let mut e = -1.0;
            for spec in &self.states[l] {
                match *spec {
                    StateSpec::Bound(n) => {
                        let ch = &self.aea.channels[l];
                        let j = n - l - 1;
                        e = ch.e_n[j];
                        let f = ch.f_n[j];
                        waves.add(ch.phi_ng[j].clone(), n as i32, e, f);
                    }
                    StateSpec::Energy(energy) => {
                        e = energy;
                        let phi_g = self.unbound_wave(l, e, &vr_g)?;
                        waves.add(phi_g, -1, e, 0.0);
                    }
                    StateSpec::Free => {
                        e += 1.0;
                        let phi_g = self.unbound_wave(l, e, &vr_g)?;
                        waves.add(phi_g, -1, e, 0.0);
                    }
                }
            }
            self.waves_l.push(waves);
        }
        Ok(())
    }

    /// Energy-normalized unbound partial wave at energy e
    fn unbound_wave(&self, l: usize, e: f64, vr_g: &Array1<f64>) -> Result<Array1<f64>> {
        let ch = Channel::new(l);
        let gc = self.rgd.round(2.5 * self.rcmax);
        let mut phi_g = self.rgd.zeros();
        let (_, a) = ch.integrate_outwards(
            &mut phi_g,
            &self.rgd,
            vr_g,
            gc,
            e,
            self.aea.scalar_relativistic,
            self.aea.z,
            None,
        )?;
        for g in 1..=gc {
            phi_g[g] /= self.rgd.r_g[g];
        }
        phi_g[0] = a;
        let norm = (self.rgd.integrate(&phi_g.mapv(|x| x * x), 0) / (4.0 * PI)).sqrt();
        Ok(phi_g / norm)
    }

    /// Pseudize all waves, construct the pseudo core density and the
    /// potentials derived from the pseudo density.
    pub fn pseudize(
        &mut self,
        kind: PseudizeKind,
        nderiv: usize,
        rcore: Option<f64>,
    ) -> Result<()> {
        let vtr_g = self
            .vtr_g
            .clone()
            .ok_or_else(|| {
                GeneratorError::StageOrder("pseudize before find_local_potential".to_string())
            })?;

        self.q = -self.aea.z + self.ncore;
        let mut nt_g = self.rgd.zeros();
        for waves in &mut self.waves_l {
            waves.pseudize(&self.rgd, kind, nderiv, &vtr_g, 2.0 * self.rcmax)?;
            nt_g += &waves.nt_g;
            self.q += waves.q;
        }
        self.nt_g = Some(nt_g);

        self.construct_pseudo_core_density(rcore)?;
        self.calculate_potentials()?;
        self.summarize();
        Ok(())
    }

    fn construct_pseudo_core_density(&mut self, rcore: Option<f64>) -> Result<()> {
        let mut rcore = match rcore {
            None => self.rcmax * 0.8,
            Some(rc) => {
                if rc.abs() > self.rcmax {
                    return Err(GeneratorError::DatasetGeneration(format!(
                        "pseudo-core radius |{}| exceeds rcmax {}",
                        rc, self.rcmax
                    )));
                }
                rc
            }
        };
        let nc_g = self.nc_g.clone().ok_or_else(|| {
            GeneratorError::StageOrder("pseudize before calculate_core_density".to_string())
        })?;
        let tauc_g = self.tauc_g.clone().expect("tauc follows nc");
        let nt_g = self.nt_g.clone().expect("valence density pseudized");

        if self.ncore == 0.0 {
            self.nct_g = Some(self.rgd.zeros());
            self.tauct_g = Some(self.rgd.zeros());
        } else if rcore > 0.0 {
            // Shrink the cutoff until the total pseudo density decreases
            // monotonically inside it
            let mut gcore;
            loop {
                if rcore <= 0.01 {
                    return Err(GeneratorError::DatasetGeneration(
                        "pseudo core density will not become monotonic".to_string(),
                    ));
                }
                gcore = self.rgd.round(rcore);
                let (nct_g, _) = self.rgd.pseudize(&nc_g, gcore, 0, 4)?;
                let ntot_g = &nt_g + &nct_g;
                let dntdr_g = self.rgd.derivative(&ntot_g);
                let max_slope = (0..gcore).map(|g| dntdr_g[g]).fold(f64::MIN, f64::max);
                if max_slope < 0.0 {
                    break;
                }
                rcore -= 0.01;
            }

            rcore *= 1.2;
            gcore = self.rgd.round(rcore);
            let (nct_g, _) = self.rgd.pseudize(&nc_g, gcore, 0, 4)?;
            self.nt_g = Some(&nt_g + &nct_g);
            self.nct_g = Some(nct_g);
            info!(
                "Constructing smooth pseudo core density for r < {:.3}",
                rcore
            );
            let (tauct_g, _) = self.rgd.pseudize(&tauc_g, gcore, 0, 4)?;
            self.tauct_g = Some(tauct_g);
        } else {
            // NLCC-style: pseudize the total density and take the core
            // part as the difference to the valence pseudo density
            rcore = -rcore;
            let gcore = self.rgd.round(rcore);
            let (ntot_g, _) = self.rgd.pseudize(&self.aea.n_g, gcore, 0, 4)?;
            self.nct_g = Some(&ntot_g - &nt_g);
            self.nt_g = Some(ntot_g);
            info!(
                "Constructing NLCC-style smooth pseudo core density for r < {:.3}",
                rcore
            );
            let (tauct_g, _) = self.rgd.pseudize(&tauc_g, gcore, 0, 4)?;
            self.tauct_g = Some(tauct_g);
        }

        self.npseudocore = self
            .rgd
            .integrate(self.nct_g.as_ref().expect("just set"), 0);
        info!("Pseudo core electrons: {:.6}", self.npseudocore);
        self.q -= self.npseudocore;
        Ok(())
    }

    fn calculate_potentials(&mut self) -> Result<()> {
        let nt_g = self.nt_g.clone().expect("pseudo density available");
        let ghat_g = self.ghat_g.clone().ok_or_else(|| {
            GeneratorError::StageOrder("potentials before construct_shape_function".to_string())
        })?;
        let vtr_g = self.vtr_g.clone().expect("local potential available");

        let rhot_g = &nt_g + &(ghat_g * self.q);
        let vhtr_g = self.rgd.poisson(&rhot_g, 0);

        let mut vxct_g = self.rgd.zeros();
        self.exct = self
            .aea
            .xc
            .calculate_spherical(&self.rgd, &nt_g, &mut vxct_g);

        let mut v0r_g = self.rgd.zeros();
        for g in 0..self.rgd.len() {
            v0r_g[g] = vtr_g[g] - vhtr_g[g] - vxct_g[g] * self.rgd.r_g[g];
        }
        for g in self.rgd.round(self.rcmax)..self.rgd.len() {
            v0r_g[g] = 0.0;
        }

        self.rhot_g = Some(rhot_g);
        self.vhtr_g = Some(vhtr_g);
        self.vxct_g = Some(vxct_g);
        self.v0r_g = Some(v0r_g);
        Ok(())
    }

    fn summarize(&self) {
        info!("Projectors:");
        info!(" state  occ         energy             norm        rcut");
        info!(" nl            [Hartree]  [eV]      [electrons]   [Bohr]");
        info!("----------------------------------------------------------");
        for (l, waves) in self.waves_l.iter().enumerate() {
            for n in 0..waves.len() {
                let e = waves.e_n[n];
                if waves.n_n[n] == -1 {
                    info!(
                        "  {}         {:10.6} {:10.5}   {:19.2}",
                        "spdf".chars().nth(l).unwrap(),
                        e,
                        e * HARTREE_TO_EV,
                        waves.rcut
                    );
                } else {
                    info!(
                        " {}{}   {:5.2} {:10.6} {:10.5}      {:5.3}  {:9.2}",
                        waves.n_n[n],
                        "spdf".chars().nth(l).unwrap(),
                        waves.f_n[n],
                        e,
                        e * HARTREE_TO_EV,
                        1.0 - waves.ds_nn[(n, n)],
                        waves.rcut
                    );
                }
            }
        }
    }

    /// Finalize the kinetic-energy correction matrices
    pub fn construct_projectors(&mut self) -> Result<()> {
        let vtr_g = self.vtr_g.clone().ok_or_else(|| {
            GeneratorError::StageOrder("construct_projectors before pseudize".to_string())
        })?;
        for waves in &mut self.waves_l {
            waves.calculate_kinetic_energy_correction(&self.rgd, &self.aea.vr_g, &vtr_g);
        }
        Ok(())
    }

    /// Validate the dataset: solve the pseudo atom in a Gaussian basis
    /// with the PAW corrections and compare against the all-electron
    /// eigenvalues.  Returns false when any channel misses the tolerance
    /// (2 meV for bound states, 20 meV for scattering states).
    pub fn check_all(&self) -> Result<bool> {
        info!(
            "Checking eigenvalues of {} pseudo atom using a Gaussian basis set:",
            self.aea.symbol
        );
        info!("                 AE [eV]        PS [eV]      error [eV]");

        let mut ok = true;
        for l in 0..4 {
            let e_b = match self.check(l) {
                Ok(e_b) => e_b,
                Err(GeneratorError::LinearAlgebra(UtilsError::SingularMatrix(_))) => {
                    warn!("Singular overlap matrix!");
                    ok = false;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let n0 = self.number_of_core_states(l);
            if l >= self.aea.channels.len() {
                continue;
            }
            let ch = &self.aea.channels[l];
            let nae = ch.f_n.len();
            let extra = 6;

            for n in (1 + l)..(nae + 1 + l + extra) {
                let j = n - 1 - l;
                let ae = ch.e_n[j] * HARTREE_TO_EV;
                if j >= n0 && j - n0 < e_b.len() {
                    let ps = e_b[j - n0] * HARTREE_TO_EV;
                    info!(
                        "{:2}{}  {:15.3}{:15.3}{:15.3}",
                        n,
                        "spdf".chars().nth(l).unwrap(),
                        ae,
                        ps,
                        ps - ae
                    );
                } else {
                    info!("{:2}{}  {:15.3}", n, "spdf".chars().nth(l).unwrap(), ae);
                }
            }

            for j in n0..nae {
                if (e_b[j - n0] - ch.e_n[j]).abs() > 2e-3 {
                    warn!("Error in bound {}-states!", "spdf".chars().nth(l).unwrap());
                    ok = false;
                    break;
                }
            }
            if !self.aea.scalar_relativistic {
                for j in nae..(nae + extra) {
                    let i = j - n0;
                    if i < e_b.len() && (e_b[i] - ch.e_n[j]).abs() > 2e-2 {
                        warn!("Error in {}-states!", "spdf".chars().nth(l).unwrap());
                        ok = false;
                        break;
                    }
                }
            }
        }
        Ok(ok)
    }

    fn number_of_core_states(&self, l: usize) -> usize {
        if l < self.waves_l.len() {
            let waves = &self.waves_l[l];
            if !waves.is_empty() {
                let n0 = waves.n_n[0] as i64 - l as i64 - 1;
                if n0 < 0 {
                    if l < self.aea.channels.len() {
                        return self.aea.channels[l]
                            .f_n
                            .iter()
                            .filter(|&&f| f > 0.0)
                            .count();
                    }
                    return 0;
                }
                return n0 as usize;
            }
            if l < self.aea.channels.len() {
                return self.aea.channels[l].f_n.iter().filter(|&&f| f > 0.0).count();
            }
            return 0;
        }
        if l < self.aea.channels.len() {
            return self.aea.channels[l].f_n.iter().filter(|&&f| f > 0.0).count();
        }
        0
    }

    /// Eigenvalues of the pseudo Hamiltonian for channel l in the
    /// Gaussian basis, including the nonlocal PAW corrections
    pub fn check(&self, l: usize) -> Result<Vec<f64>> {
        let vtr_g = self.vtr_g.as_ref().ok_or_else(|| {
            GeneratorError::StageOrder("check before find_local_potential".to_string())
        })?;
        let alpha_b = &self.aea.basis_l[0].alpha_b;
        let basis = GaussianBasis::new(l, alpha_b, &self.rgd, 1e-8)?;
        let nb = basis.len();

        let v_bb = basis.calculate_potential_matrix(&self.rgd, vtr_g);
        let mut h = Mat::<f64>::zeros(nb, nb);
        let mut s = Mat::<f64>::identity(nb, nb);
        for i in 0..nb {
            for j in 0..nb {
                h[(i, j)] = basis.t_bb[(i, j)] + v_bb[(i, j)];
            }
        }

        if l < self.waves_l.len() && !self.waves_l[l].is_empty() {
            let waves = &self.waves_l[l];
            let nw = waves.len();
            // P_bn = <basis_b | pt_n>
            let mut p_bn = Array2::zeros((nb, nw));
            for b in 0..nb {
                for n in 0..nw {
                    p_bn[(b, n)] = self
                        .rgd
                        .integrate(&(&basis.basis_bg[b] * &waves.pt_ng[n]), 0)
                        / (4.0 * PI);
                }
            }
            for b1 in 0..nb {
                for b2 in 0..nb {
                    let mut dh = 0.0;
                    let mut ds = 0.0;
                    for n1 in 0..nw {
                        for n2 in 0..nw {
                            dh += p_bn[(b1, n1)] * waves.dh_nn[(n1, n2)] * p_bn[(b2, n2)];
                            ds += p_bn[(b1, n1)] * waves.ds_nn[(n1, n2)] * p_bn[(b2, n2)];
                        }
                    }
                    h[(b1, b2)] += dh;
                    s[(b1, b2)] += ds;
                }
            }
        }

        let (e_b, _) = general_diagonalize(&h, &s)?;
        Ok(e_b)
    }

    /// Logarithmic derivatives of the pseudo atom including the nonlocal
    /// PAW corrections, comparable to
    /// [`AllElectronAtom::logarithmic_derivative`]
    pub fn logarithmic_derivative(
        &self,
        l: usize,
        energies: &[f64],
        rcut: f64,
    ) -> Result<Vec<f64>> {
        let vtr_g = self.vtr_g.as_ref().ok_or_else(|| {
            GeneratorError::StageOrder("log-derivative before find_local_potential".to_string())
        })?;
        let rgd = &self.rgd;
        let ch = Channel::new(l);
        let gcut = rgd.round(rcut);

        let waves = self.waves_l.get(l).filter(|w| !w.is_empty());
        let nw = waves.map_or(0, |w| w.len());

        let mut logderivs = Vec::with_capacity(energies.len());
        let mut d0 = 42.0;
        let mut offset = 0.0;
        for &e in energies {
            let mut u_g = rgd.zeros();
            let (mut dudr, _) =
                ch.integrate_outwards(&mut u_g, rgd, vtr_g, gcut, e, false, 0.0, None)?;
            let mut u = u_g[gcut];

            if let Some(waves) = waves {
                let mut u_ng = Vec::with_capacity(nw);
                let mut dudr_n = vec![0.0; nw];
                for n in 0..nw {
                    let mut un_g = rgd.zeros();
                    let (d, _) = ch.integrate_outwards(
                        &mut un_g,
                        rgd,
                        vtr_g,
                        gcut,
                        e,
                        false,
                        0.0,
                        Some(&waves.pt_ng[n]),
                    )?;
                    dudr_n[n] = d;
                    u_ng.push(un_g);
                }

                // d_n = (A B + 1)^-1 A c
                let mut ab = Mat::<f64>::zeros(nw, nw);
                let mut ac = vec![0.0; nw];
                for n1 in 0..nw {
                    let mut c1 = 0.0;
                    for n2 in 0..nw {
                        let a12 = (waves.dh_nn[(n1, n2)] - e * waves.ds_nn[(n1, n2)])
                            / (4.0 * PI);
                        let mut b2 = vec![0.0; nw];
                        for n3 in 0..nw {
                            b2[n3] = rgd.integrate(&(&waves.pt_ng[n2] * &u_ng[n3]), -1);
                        }
                        for n3 in 0..nw {
                            ab[(n1, n3)] += a12 * b2[n3];
                        }
                        c1 += a12 * rgd.integrate(&(&waves.pt_ng[n2] * &u_g), -1);
                    }
                    ab[(n1, n1)] += 1.0;
                    ac[n1] = c1;
                }
                let d_n = solve_vec(&ab, &ac)?;
                for n in 0..nw {
                    u -= u_ng[n][gcut] * d_n[n];
                    dudr -= dudr_n[n] * d_n[n];
                }
            }

            let mut d1 = (dudr / u).atan() / PI + offset;
            if d1 > d0 {
                offset -= 1.0;
                d1 -= 1.0;
            }
            logderivs.push(d1);
            d0 = d1;
        }
        Ok(logderivs)
    }

    /// Plane-wave convergence estimate for the generated dataset.
    ///
    /// Transforms the pseudo quantities to reciprocal space and reports,
    /// for a ladder of energy tolerances (1e-4 to 1e-1 eV), the cutoff
    /// energy (eV) and the equivalent grid spacing (Bohr) at which each
    /// energy contribution is converged to that tolerance.  Rows:
    /// e-e, c-c, g-g, kin, vt.
    pub fn convergence_report(&self) -> Result<Vec<(String, Vec<(f64, f64)>)>> {
        let nt_g = self.nt_g.as_ref().ok_or_else(|| {
            GeneratorError::StageOrder("convergence report before pseudize".to_string())
        })?;
        let rhot_g = self.rhot_g.as_ref().expect("potentials follow pseudize");
        let ghat_g = self.ghat_g.as_ref().expect("shape function built");
        let vtr_g = self.vtr_g.as_ref().expect("local potential built");
        let phit_g = self
            .waves_l
            .first()
            .filter(|w| !w.is_empty())
            .map(|w| &w.phit_ng[0])
            .ok_or_else(|| {
                GeneratorError::StageOrder("convergence report needs s-waves".to_string())
            })?;

        let r_g = &self.rgd.r_g;
        let (g_k, nt_k) = self.rgd.fft(&(nt_g * r_g));
        let rhot_k = self.rgd.fft(&(rhot_g * r_g)).1;
        let ghat_k = self.rgd.fft(&(ghat_g * r_g)).1;
        let vt_k = self.rgd.fft(vtr_g).1;
        let phi_k = self.rgd.fft(&(phit_g * r_g)).1;

        let nk = g_k.len();
        let dg = g_k[1];
        let two_pi3 = (2.0 * PI).powi(3);
        let mut rows: Vec<(String, Array1<f64>)> = Vec::new();
        let quad = 16.0 * PI * PI / two_pi3;
        rows.push((
            "e-e".to_string(),
            Array1::from_iter((0..nk).map(|k| 0.5 * nt_k[k] * nt_k[k] * quad)),
        ));
        rows.push((
            "c-c".to_string(),
            Array1::from_iter((0..nk).map(|k| 0.5 * rhot_k[k] * rhot_k[k] * quad)),
        ));
        rows.push((
            "g-g".to_string(),
            Array1::from_iter((0..nk).map(|k| 0.5 * ghat_k[k] * ghat_k[k] * quad)),
        ));
        rows.push((
            "kin".to_string(),
            Array1::from_iter(
                (0..nk).map(|k| 0.5 * phi_k[k] * phi_k[k] * g_k[k].powi(4) / two_pi3),
            ),
        ));
        rows.push((
            "vt".to_string(),
            Array1::from_iter(
                (0..nk)
                    .map(|k| nt_k[k] * vt_k[k] * g_k[k] * g_k[k] * 4.0 * PI / two_pi3),
            ),
        ));

        let tolerances = [1e-4, 1e-3, 1e-2, 1e-1].map(|ev: f64| ev / HARTREE_TO_EV);
        info!("Convergence of energy (cutoff [eV] at tolerance):");
        let mut report = Vec::new();
        for (label, e_k) in rows {
            // Cumulative trapezoid of the reciprocal-space integrand
            let mut acc = Array1::zeros(nk);
            let mut running = 0.0;
            for k in 0..nk {
                running += e_k[k];
                acc[k] = (running - 0.5 * e_k[0] - 0.5 * e_k[k]) * dg;
            }
            let total = acc[nk - 1];
            let mut cutoffs = Vec::with_capacity(tolerances.len());
            let mut k = nk - 1;
            for &tolerance in &tolerances {
                while k > 1 && (acc[k] - total).abs() < tolerance {
                    k -= 1;
                }
                let g = k as f64 * dg;
                let ecut = 0.5 * g * g;
                cutoffs.push((ecut * HARTREE_TO_EV, PI / g));
            }
            info!(
                "{:>4}: {}",
                label,
                cutoffs
                    .iter()
                    .map(|(e, h)| format!("{:8.1} ({:4.2})", e, h))
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            report.push((label, cutoffs));
        }
        Ok(report)
    }

    /// Core states not represented by projectors, as (l, phi) pairs
    fn find_core_states(&self) -> (usize, Vec<(usize, Array1<f64>)>) {
        let mut core = Vec::new();
        let mut lmax = 0;
        for (l, ch) in self.aea.channels.iter().enumerate() {
            for j in 0..ch.f_n.len() {
                let n = (j + l + 1) as i32;
                let in_waves =
                    l < self.waves_l.len() && self.waves_l[l].n_n.contains(&n);
                if !in_waves {
                    core.push((l, ch.phi_ng[j].clone()));
                    lmax = lmax.max(l);
                }
            }
        }
        lmax = lmax.max(self.waves_l.len().saturating_sub(1));
        (lmax, core)
    }

    /// Total number of projector functions counting m degeneracy
    pub fn nprojectors(&self) -> usize {
        self.waves_l
            .iter()
            .enumerate()
            .map(|(l, waves)| waves.len() * (2 * l + 1))
            .sum()
    }

    /// Core-core and core-valence exact-exchange integrals
    pub fn calculate_exx_integrals(&mut self) -> Result<()> {
        let (lmax, core) = self.find_core_states();
        let g_llm = gaunt(lmax);

        // Core-core energy
        self.exxcc = 0.0;
        for (j1, (l1, phi1_g)) in core.iter().enumerate() {
            let mut f = 1.0;
            for (l2, phi2_g) in core.iter().skip(j1) {
                let n_g = phi1_g * phi2_g;
                for l in (((l1 + l2) % 2)..=(l1 + l2)).step_by(2) {
                    let mut gsum = 0.0;
                    for m1 in 0..(2 * l1 + 1) {
                        for m2 in 0..(2 * l2 + 1) {
                            for m in 0..(2 * l + 1) {
                                let value =
                                    g_llm[(l1 * l1 + m1, l2 * l2 + m2, l * l + m)];
                                gsum += value * value;
                            }
                        }
                    }
                    let vr_g = self.rgd.poisson(&n_g, l as i32);
                    let e = f * self.rgd.integrate(&(&vr_g * &n_g), -1) / (4.0 * PI);
                    self.exxcc -= e * gsum;
                }
                f = 2.0;
            }
        }
        info!("EXX (core-core): {:.6} Hartree", self.exxcc);

        let ni = self.nprojectors();
        self.exxcv_ii = Some(self.calculate_exx_cv_integrals(ni, 0.0));
        Ok(())
    }

    /// Screened (Yukawa) core-valence exchange integrals
    pub fn calculate_yukawa_integrals(&mut self) -> Result<()> {
        let ni = self.nprojectors();
        self.exxgcv_ii = Some(self.calculate_exx_cv_integrals(ni, self.yukawa_gamma));
        Ok(())
    }

    fn calculate_exx_cv_integrals(&self, ni: usize, yukawa_gamma: f64) -> Array2<f64> {
        let (lmax, core) = self.find_core_states();
        let g_llm = gaunt(lmax);

        // Flattened valence list with projector-index offsets
        let mut valence: Vec<(usize, usize, usize)> = Vec::new(); // (l, wave, i)
        let mut i = 0;
        for (l, waves) in self.waves_l.iter().enumerate() {
            for n in 0..waves.len() {
                valence.push((l, n, i));
                i += 2 * l + 1;
            }
        }

        let pairs: Vec<((usize, usize, usize), (usize, usize, usize))> = valence
            .iter()
            .flat_map(|&a| valence.iter().map(move |&b| (a, b)))
            .collect();

        let blocks: Vec<((usize, usize), Array2<f64>)> = pairs
            .par_iter()
            .map(|&((l1, n1, i1), (l2, n2, i2))| {
                let phi1_g = &self.waves_l[l1].phi_ng[n1];
                let phi2_g = &self.waves_l[l2].phi_ng[n2];
                let mut x_mm = Array2::zeros((2 * l1 + 1, 2 * l2 + 1));
                if (l1 + l2) % 2 == 0 {
                    for (lc, phic_g) in &core {
                        let n_g = phi1_g * phic_g;
                        for l in (((l1 + lc) % 2)..=(l1.max(l2) + lc)).step_by(2) {
                            let n2c_g = phi2_g * phic_g;
                            let vr_g = if yukawa_gamma > 0.0 {
                                self.rgd.yukawa(&n2c_g, l as i32, yukawa_gamma)
                            } else {
                                self.rgd.poisson(&n2c_g, l as i32)
                            };
                            let e = self.rgd.integrate(&(&vr_g * &n_g), -1) / (4.0 * PI);
                            for mc in 0..(2 * lc + 1) {
                                for m in 0..(2 * l + 1) {
                                    for m1 in 0..(2 * l1 + 1) {
                                        for m2 in 0..(2 * l2 + 1) {
                                            x_mm[(m1, m2)] += e
                                                * g_llm[(
                                                    l1 * l1 + m1,
                                                    lc * lc + mc,
                                                    l * l + m,
                                                )]
                                                * g_llm[(
                                                    l2 * l2 + m2,
                                                    lc * lc + mc,
                                                    l * l + m,
                                                )];
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                ((i1, i2), x_mm)
            })
            .collect();

        let mut cv_ii = Array2::zeros((ni, ni));
        for ((i1, i2), x_mm) in blocks {
            for (m1, row) in x_mm.outer_iter().enumerate() {
                for (m2, &value) in row.iter().enumerate() {
                    cv_ii[(i1 + m1, i2 + m2)] = value;
                }
            }
        }
        cv_ii
    }

    /// Package the generated dataset.
    ///
    /// Bound states come first (reordered within each channel), then the
    /// unbound waves, matching the layout every consumer of the dataset
    /// assumes.
    pub fn make_paw_setup(&mut self, tag: Option<&str>) -> Result<SetupData> {
        if self.waves_l.iter().any(|w| w.dekin_nn.is_empty() && !w.is_empty()) {
            return Err(GeneratorError::StageOrder(
                "make_paw_setup before construct_projectors".to_string(),
            ));
        }
        if self.exxcv_ii.is_none() {
            self.calculate_exx_integrals()?;
        }
        if self.yukawa_gamma > 0.0 && self.exxgcv_ii.is_none() {
            self.calculate_yukawa_integrals()?;
        }

        let aea = &self.aea;
        let rgd = &self.rgd;
        let sqrt4pi = (4.0 * PI).sqrt();

        let mut data = SetupData::new(
            &aea.symbol,
            aea.xc.name(),
            tag,
            rgd.beta,
            rgd.len(),
        );

        // Bound states first, then excited states; remember the
        // permutations for the j- and i-indexed matrices
        let mut j_order: Vec<usize> = Vec::new();
        let mut i_order: Vec<usize> = Vec::new();
        for bound_pass in [true, false] {
            let mut j = 0;
            let mut i = 0;
            let mut ne_l = vec![0usize; self.waves_l.len()];
            for (l, waves) in self.waves_l.iter().enumerate() {
                for n in 0..waves.len() {
                    let bound = waves.n_n[n] != -1;
                    if bound == bound_pass {
                        data.append(
                            waves.n_n[n],
                            l,
                            waves.f_n[n],
                            waves.e_n[n],
                            waves.rcut,
                            waves.phi_ng[n].clone(),
                            waves.phit_ng[n].clone(),
                            waves.pt_ng[n].clone(),
                        );
                        let id = if bound {
                            format!("{}{}", waves.n_n[n], "spdf".chars().nth(l).unwrap())
                        } else {
                            ne_l[l] += 1;
                            format!("{}{}", "spdf".chars().nth(l).unwrap(), ne_l[l])
                        };
                        data.id_j.push(id);
                        j_order.push(j);
                        i_order.extend(i..i + 2 * l + 1);
                    }
                    j += 1;
                    i += 2 * l + 1;
                }
            }
        }

        // Kinetic-energy matrix, block diagonal per channel, reordered
        let nj: usize = self.waves_l.iter().map(|w| w.len()).sum();
        let mut e_kin_jj = Array2::zeros((nj, nj));
        let mut j1 = 0;
        for waves in &self.waves_l {
            let j2 = j1 + waves.len();
            for a in j1..j2 {
                for b in j1..j2 {
                    e_kin_jj[(a, b)] = waves.dekin_nn[(a - j1, b - j1)];
                }
            }
            j1 = j2;
        }
        let mut e_kin_reordered = Array2::zeros((nj, nj));
        for (a, &ja) in j_order.iter().enumerate() {
            for (b, &jb) in j_order.iter().enumerate() {
                e_kin_reordered[(a, b)] = e_kin_jj[(ja, jb)];
            }
        }
        data.e_kin_jj = e_kin_reordered;

        data.nc_g = self.nc_g.clone().unwrap_or_else(|| rgd.zeros()) * sqrt4pi;
        data.nct_g = self.nct_g.clone().unwrap_or_else(|| rgd.zeros()) * sqrt4pi;
        data.tauc_g = self.tauc_g.clone().unwrap_or_else(|| rgd.zeros()) * sqrt4pi;
        data.tauct_g = self.tauct_g.clone().unwrap_or_else(|| rgd.zeros()) * sqrt4pi;
        data.e_kinetic_core = self.ekincore;

        let v0r_g = self.v0r_g.clone().ok_or_else(|| {
            GeneratorError::StageOrder("make_paw_setup before pseudize".to_string())
        })?;
        let mut vbar_g = v0r_g * sqrt4pi;
        for g in 1..rgd.len() {
            vbar_g[g] /= rgd.r_g[g];
        }
        vbar_g[0] = vbar_g[1];
        data.vbar_g = vbar_g;

        data.z = aea.z as usize;
        data.nc = self.ncore;
        data.nv = self.nvalence;
        data.e_kinetic = aea.ekin;
        data.e_xc = aea.exc;
        data.e_electrostatic = aea.eh + aea.ez;
        data.e_total = aea.exc + aea.ekin + aea.eh + aea.ez;
        data.rcgauss = 1.0
            / self
                .alpha
                .ok_or_else(|| {
                    GeneratorError::StageOrder(
                        "make_paw_setup before construct_shape_function".to_string(),
                    )
                })?
                .sqrt();

        data.exx_c = self.exxcc;
        let exxcv_ii = self.exxcv_ii.as_ref().expect("exx integrals computed");
        data.x_p = pack(&reorder(exxcv_ii, &i_order));
        if let Some(exxgcv_ii) = &self.exxgcv_ii {
            data.x_pg = Some(pack(&reorder(exxgcv_ii, &i_order)));
            data.x_gamma = self.yukawa_gamma;
        }

        data.generator_relativity = if aea.scalar_relativistic {
            "scalar-relativistic".to_string()
        } else {
            "non-relativistic".to_string()
        };
        data.generator_version = 2;

        data.l0 = self.l0;
        data.e0 = 0.0;
        data.r0 = self.r0;
        data.nderiv0 = self.nderiv0;

        if let Some((n, l, occ)) = self.core_hole {
            let phi_g = self.aea.channels[l].phi_ng[n - l - 1].clone();
            data.set_core_hole(n, l, occ, phi_g);
        }

        Ok(data)
    }
}

fn reorder(a_ii: &Array2<f64>, order: &[usize]) -> Array2<f64> {
    let n = order.len();
    let mut out = Array2::zeros((n, n));
    for (i, &oi) in order.iter().enumerate() {
        for (j, &oj) in order.iter().enumerate() {
            out[(i, j)] = a_ii[(oi, oj)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_projectors() {
        let spec = parse_projectors("2s,s,2p,p,d,F").unwrap();
        assert_eq!(spec.lmax, Some(2));
        assert_eq!(spec.l0, Some(3));
        assert_eq!(
            spec.states[0],
            vec![StateSpec::Bound(2), StateSpec::Free]
        );
        assert_eq!(
            spec.states[1],
            vec![StateSpec::Bound(2), StateSpec::Free]
        );
        assert_eq!(spec.states[2], vec![StateSpec::Free]);
    }

    #[test]
    fn test_parse_energy_spec() {
        let spec = parse_projectors("5s,6s,5p,6p,5d,0.5d,F").unwrap();
        assert_eq!(
            spec.states[2],
            vec![StateSpec::Bound(5), StateSpec::Energy(0.5)]
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_projectors("2x").is_err());
        assert!(parse_projectors("").is_err());
    }
}
