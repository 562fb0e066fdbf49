/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Raw PAW dataset container and its XML file format
//!
//! [`SetupData`] is the single value type shared by the generator (which
//! fills it) and the runtime [`crate::setup::Setup`] (which derives the
//! correction tensors from it).  Radial functions carrying a Y_00 factor
//! (core densities, zero potential) are stored scaled by sqrt(4 pi), the
//! convention of the dataset files.
//!
//! Datasets round-trip through an XML file: `write_xml` followed by
//! `read_xml` reproduces numerically identical data.

use super::errors::{Result, SetupError};
use crate::radial::RadialGrid;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

/// Everything a PAW dataset file contains
#[derive(Debug, Clone)]
pub struct SetupData {
    /// Chemical symbol
    pub symbol: String,
    /// Functional the dataset was generated with
    pub setupname: String,
    /// Optional dataset tag (e.g. "semicore")
    pub name: Option<String>,
    /// Atomic number
    pub z: usize,
    /// Number of core electrons
    pub nc: f64,
    /// Number of valence electrons
    pub nv: f64,
    /// Radial grid parameter b of r = b g / (n - g)
    pub beta: f64,
    /// Number of radial grid points
    pub ng: usize,

    /// Angular momentum per projector channel
    pub l_j: Vec<usize>,
    /// Principal quantum number (-1 for unbound waves)
    pub n_j: Vec<i32>,
    /// Occupations
    pub f_j: Vec<f64>,
    /// Reference energies
    pub eps_j: Vec<f64>,
    /// Cutoff radii
    pub rcut_j: Vec<f64>,
    /// State labels ("2s", "s1", ...)
    pub id_j: Vec<String>,
    /// All-electron partial waves
    pub phi_jg: Vec<Array1<f64>>,
    /// Pseudo partial waves
    pub phit_jg: Vec<Array1<f64>>,
    /// Projector functions
    pub pt_jg: Vec<Array1<f64>>,

    /// Core density (scaled by sqrt(4 pi))
    pub nc_g: Array1<f64>,
    /// Pseudo core density (scaled)
    pub nct_g: Array1<f64>,
    /// Core kinetic-energy density (scaled)
    pub tauc_g: Array1<f64>,
    /// Pseudo core kinetic-energy density (scaled)
    pub tauct_g: Array1<f64>,
    /// Zero potential vbar (scaled)
    pub vbar_g: Array1<f64>,

    /// Kinetic-energy differences between partial-wave pairs
    pub e_kin_jj: Array2<f64>,
    /// Core kinetic energy
    pub e_kinetic_core: f64,
    /// Total kinetic energy of the reference atom
    pub e_kinetic: f64,
    /// XC energy of the reference atom
    pub e_xc: f64,
    /// Electrostatic energy of the reference atom
    pub e_electrostatic: f64,
    /// Total energy of the reference atom
    pub e_total: f64,

    /// Width of the compensation-charge Gaussian, 1/sqrt(alpha)
    pub rcgauss: f64,

    /// Core-core exact-exchange energy
    pub exx_c: f64,
    /// Packed core-valence exact-exchange matrix
    pub x_p: Array1<f64>,
    /// Packed screened core-valence exchange matrix
    pub x_pg: Option<Array1<f64>>,
    /// Screening parameter belonging to x_pg
    pub x_gamma: f64,

    /// Relativity level of the generator
    pub generator_relativity: String,
    /// Dataset format generation
    pub generator_version: u32,
    /// Free-form provenance text
    pub generatordata: String,

    /// Local-potential matching channel
    pub l0: Option<usize>,
    /// Matching energy
    pub e0: f64,
    /// Matching radius
    pub r0: f64,
    /// Polynomial terms of the local potential
    pub nderiv0: usize,

    /// Core-hole orbital, if the dataset carries one
    pub phicorehole_g: Option<Array1<f64>>,
    pub ncorehole: usize,
    pub lcorehole: usize,
    pub fcorehole: f64,
}

impl SetupData {
    /// Fresh, empty dataset
    pub fn new(symbol: &str, setupname: &str, tag: Option<&str>, beta: f64, ng: usize) -> Self {
        SetupData {
            symbol: symbol.to_string(),
            setupname: setupname.to_string(),
            name: tag.map(|t| t.to_string()),
            z: 0,
            nc: 0.0,
            nv: 0.0,
            beta,
            ng,
            l_j: Vec::new(),
            n_j: Vec::new(),
            f_j: Vec::new(),
            eps_j: Vec::new(),
            rcut_j: Vec::new(),
            id_j: Vec::new(),
            phi_jg: Vec::new(),
            phit_jg: Vec::new(),
            pt_jg: Vec::new(),
            nc_g: Array1::zeros(ng),
            nct_g: Array1::zeros(ng),
            tauc_g: Array1::zeros(ng),
            tauct_g: Array1::zeros(ng),
            vbar_g: Array1::zeros(ng),
            e_kin_jj: Array2::zeros((0, 0)),
            e_kinetic_core: 0.0,
            e_kinetic: 0.0,
            e_xc: 0.0,
            e_electrostatic: 0.0,
            e_total: 0.0,
            rcgauss: 0.0,
            exx_c: 0.0,
            x_p: Array1::zeros(0),
            x_pg: None,
            x_gamma: 0.0,
            generator_relativity: "non-relativistic".to_string(),
            generator_version: 2,
            generatordata: String::new(),
            l0: None,
            e0: 0.0,
            r0: 0.0,
            nderiv0: 0,
            phicorehole_g: None,
            ncorehole: 0,
            lcorehole: 0,
            fcorehole: 0.0,
        }
    }

    /// Append one projector channel
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        n: i32,
        l: usize,
        f: f64,
        e: f64,
        rcut: f64,
        phi_g: Array1<f64>,
        phit_g: Array1<f64>,
        pt_g: Array1<f64>,
    ) {
        self.n_j.push(n);
        self.l_j.push(l);
        self.f_j.push(f);
        self.eps_j.push(e);
        self.rcut_j.push(rcut);
        self.phi_jg.push(phi_g);
        self.phit_jg.push(phit_g);
        self.pt_jg.push(pt_g);
    }

    /// Record a core hole
    pub fn set_core_hole(&mut self, n: usize, l: usize, f: f64, phi_g: Array1<f64>) {
        self.ncorehole = n;
        self.lcorehole = l;
        self.fcorehole = f;
        self.phicorehole_g = Some(phi_g);
    }

    /// Reconstruct the radial grid the dataset lives on
    pub fn rgd(&self) -> RadialGrid {
        RadialGrid::new(self.beta, self.ng)
    }

    /// Number of projector channels
    pub fn nj(&self) -> usize {
        self.l_j.len()
    }

    /// Overlap correction from the monopole compensation-charge block
    pub fn get_overlap_correction(&self, delta0_ii: &Array2<f64>) -> Array2<f64> {
        delta0_ii * (4.0 * PI).sqrt()
    }

    /// Analytic integral of the pseudo core density
    pub fn get_smooth_core_density_integral(&self, delta0: f64) -> f64 {
        -delta0 * (4.0 * PI).sqrt() - self.z as f64 + self.nc
    }

    /// Linear kinetic-energy correction K_p from the packed T tensor
    pub fn get_linear_kinetic_correction(&self, t0_qp: &Array2<f64>) -> Array1<f64> {
        let nj = self.nj();
        let mut k_q = Vec::with_capacity(nj * (nj + 1) / 2);
        for j1 in 0..nj {
            for j2 in j1..nj {
                k_q.push(self.e_kin_jj[(j1, j2)]);
            }
        }
        let np = t0_qp.ncols();
        let mut k_p = Array1::zeros(np);
        for p in 0..np {
            for (q, &k) in k_q.iter().enumerate() {
                k_p[p] += k * t0_qp[(q, p)];
            }
        }
        k_p * (4.0 * PI).sqrt()
    }

    /// Generalized Gaussians g_l(r) = c_l r^l exp(-alpha r²), normalized
    /// so that the multipole integral ∫ g_l r^(l+2) dr is one
    pub fn create_compensation_charge_functions(&self, lmax: usize) -> Vec<Array1<f64>> {
        let rgd = self.rgd();
        let alpha = self.rcgauss.powi(-2);
        let mut g_lg = Vec::with_capacity(lmax + 1);
        for l in 0..=lmax {
            let mut g = rgd
                .r_g
                .mapv(|r| r.powi(l as i32) * (-alpha * r * r).exp());
            let norm = rgd.integrate(&g, l as i32) / (4.0 * PI);
            g /= norm;
            g_lg.push(g);
        }
        g_lg
    }

    /// Radius beyond which the core density is negligible
    pub fn find_core_density_cutoff(&self) -> f64 {
        if self.nc <= 0.0 {
            return 0.5;
        }
        let rgd = self.rgd();
        let mut rcore = 0.5;
        for g in (1..rgd.len()).rev() {
            let n4pir2 = (4.0 * PI).sqrt() * self.nc_g[g] * rgd.r_g[g] * rgd.r_g[g];
            if n4pir2.abs() > 1e-7 {
                rcore = rgd.r_g[g];
                break;
            }
        }
        rcore
    }

    /// Canonical file stem, e.g. "O.LDA" or "O.semicore.LDA"
    pub fn filename(&self) -> String {
        match &self.name {
            Some(tag) => format!("{}.{}.{}", self.symbol, tag, self.setupname),
            None => format!("{}.{}", self.symbol, self.setupname),
        }
    }

    /// Write the dataset as XML.
    pub fn write_xml(&self, path: &Path) -> Result<()> {
        let mut f = File::create(path)?;
        writeln!(f, "<?xml version=\"1.0\"?>")?;
        writeln!(f, "<paw_setup version=\"0.6\">")?;
        writeln!(
            f,
            "  <atom symbol=\"{}\" Z=\"{}\" core=\"{:.6}\" valence=\"{:.6}\"/>",
            self.symbol, self.z, self.nc, self.nv
        )?;
        writeln!(f, "  <xc_functional type=\"{}\"/>", self.setupname)?;
        writeln!(
            f,
            "  <generator type=\"{}\" name=\"gpaw-rs-{}\" version=\"{}\">{}</generator>",
            self.generator_relativity,
            crate::VERSION,
            self.generator_version,
            self.generatordata
        )?;
        writeln!(
            f,
            "  <ae_energy kinetic=\"{:.12e}\" xc=\"{:.12e}\" electrostatic=\"{:.12e}\" total=\"{:.12e}\"/>",
            self.e_kinetic, self.e_xc, self.e_electrostatic, self.e_total
        )?;
        writeln!(
            f,
            "  <core_energy kinetic=\"{:.12e}\"/>",
            self.e_kinetic_core
        )?;
        writeln!(
            f,
            "  <shape_function type=\"gauss\" rc=\"{:.12e}\"/>",
            self.rcgauss
        )?;
        writeln!(
            f,
            "  <radial_grid eq=\"r=a*i/(n-i)\" a=\"{:.12e}\" n=\"{}\" id=\"g1\"/>",
            self.beta, self.ng
        )?;

        writeln!(f, "  <valence_states>")?;
        for j in 0..self.nj() {
            if self.n_j[j] > 0 {
                writeln!(
                    f,
                    "    <state n=\"{}\" l=\"{}\" f=\"{:.6}\" rc=\"{:.6}\" e=\"{:.12e}\" id=\"{}\"/>",
                    self.n_j[j], self.l_j[j], self.f_j[j], self.rcut_j[j], self.eps_j[j],
                    self.id_j[j]
                )?;
            } else {
                writeln!(
                    f,
                    "    <state l=\"{}\" rc=\"{:.6}\" e=\"{:.12e}\" id=\"{}\"/>",
                    self.l_j[j], self.rcut_j[j], self.eps_j[j], self.id_j[j]
                )?;
            }
        }
        writeln!(f, "  </valence_states>")?;

        write_array(&mut f, "ae_core_density", &[], &self.nc_g)?;
        write_array(&mut f, "pseudo_core_density", &[], &self.nct_g)?;
        write_array(
            &mut f,
            "ae_core_kinetic_energy_density",
            &[],
            &self.tauc_g,
        )?;
        write_array(
            &mut f,
            "pseudo_core_kinetic_energy_density",
            &[],
            &self.tauct_g,
        )?;
        let mut vbar_attrs: Vec<(String, String)> = vec![
            ("e0".to_string(), format!("{:.12e}", self.e0)),
            ("r0".to_string(), format!("{:.12e}", self.r0)),
            ("nderiv0".to_string(), self.nderiv0.to_string()),
        ];
        if let Some(l0) = self.l0 {
            vbar_attrs.push(("l0".to_string(), l0.to_string()));
        }
        write_array(&mut f, "zero_potential", &vbar_attrs, &self.vbar_g)?;

        for j in 0..self.nj() {
            let state = [("state".to_string(), self.id_j[j].clone())];
            write_array(&mut f, "ae_partial_wave", &state, &self.phi_jg[j])?;
            write_array(&mut f, "pseudo_partial_wave", &state, &self.phit_jg[j])?;
            write_array(&mut f, "projector_function", &state, &self.pt_jg[j])?;
        }

        let flat: Array1<f64> = Array1::from_iter(self.e_kin_jj.iter().cloned());
        write_array(&mut f, "kinetic_energy_differences", &[], &flat)?;
        write_array(&mut f, "exact_exchange_X_matrix", &[], &self.x_p)?;
        writeln!(
            f,
            "  <exact_exchange core-core=\"{:.12e}\"/>",
            self.exx_c
        )?;
        if let Some(x_pg) = &self.x_pg {
            write_array(
                &mut f,
                "yukawa_exchange_X_matrix",
                &[("gamma".to_string(), format!("{:.12e}", self.x_gamma))],
                x_pg,
            )?;
        }
        if let Some(phicorehole_g) = &self.phicorehole_g {
            write_array(
                &mut f,
                "core_hole_state",
                &[
                    ("n".to_string(), self.ncorehole.to_string()),
                    ("l".to_string(), self.lcorehole.to_string()),
                    ("removed".to_string(), format!("{:.6}", self.fcorehole)),
                ],
                phicorehole_g,
            )?;
        }
        writeln!(f, "</paw_setup>")?;
        Ok(())
    }

    /// Read a dataset back from XML.
    pub fn read_xml(path: &Path) -> Result<SetupData> {
        let file = File::open(path)?;
        let parser = EventReader::new(BufReader::new(file));
        let bad = |reason: &str| SetupError::BadFile {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };

        let mut data = SetupData::new("X", "LDA", None, 0.0, 0);
        let mut element = String::new();
        let mut attrs: Vec<OwnedAttribute> = Vec::new();
        let mut text = String::new();
        let mut wave_kind = 0usize;

        for event in parser {
            match event.map_err(|e| bad(&e.to_string()))? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    element = name.local_name.clone();
                    attrs = attributes;
                    text.clear();
                    match element.as_str() {
                        "atom" => {
                            data.symbol = attr(&attrs, "symbol").ok_or_else(|| bad("no symbol"))?;
                            data.z = parse_attr(&attrs, "Z").ok_or_else(|| bad("no Z"))? as usize;
                            data.nc = parse_attr(&attrs, "core").unwrap_or(0.0);
                            data.nv = parse_attr(&attrs, "valence").unwrap_or(0.0);
                        }
                        "xc_functional" => {
                            data.setupname =
                                attr(&attrs, "type").ok_or_else(|| bad("no xc type"))?;
                        }
                        "generator" => {
                            data.generator_relativity =
                                attr(&attrs, "type").unwrap_or_default();
                            data.generator_version =
                                parse_attr(&attrs, "version").unwrap_or(2.0) as u32;
                        }
                        "ae_energy" => {
                            data.e_kinetic = parse_attr(&attrs, "kinetic").unwrap_or(0.0);
                            data.e_xc = parse_attr(&attrs, "xc").unwrap_or(0.0);
                            data.e_electrostatic =
                                parse_attr(&attrs, "electrostatic").unwrap_or(0.0);
                            data.e_total = parse_attr(&attrs, "total").unwrap_or(0.0);
                        }
                        "core_energy" => {
                            data.e_kinetic_core = parse_attr(&attrs, "kinetic").unwrap_or(0.0);
                        }
                        "shape_function" => {
                            data.rcgauss = parse_attr(&attrs, "rc").ok_or_else(|| bad("no rc"))?;
                        }
                        "radial_grid" => {
                            data.beta = parse_attr(&attrs, "a").ok_or_else(|| bad("no a"))?;
                            data.ng = parse_attr(&attrs, "n").ok_or_else(|| bad("no n"))? as usize;
                        }
                        "state" => {
                            data.n_j
                                .push(parse_attr(&attrs, "n").map_or(-1, |n| n as i32));
                            data.l_j
                                .push(parse_attr(&attrs, "l").ok_or_else(|| bad("state l"))?
                                    as usize);
                            data.f_j.push(parse_attr(&attrs, "f").unwrap_or(0.0));
                            data.rcut_j
                                .push(parse_attr(&attrs, "rc").ok_or_else(|| bad("state rc"))?);
                            data.eps_j
                                .push(parse_attr(&attrs, "e").ok_or_else(|| bad("state e"))?);
                            data.id_j
                                .push(attr(&attrs, "id").ok_or_else(|| bad("state id"))?);
                        }
                        "exact_exchange" => {
                            data.exx_c = parse_attr(&attrs, "core-core").unwrap_or(0.0);
                        }
                        _ => {}
                    }
                }
                XmlEvent::Characters(chunk) => {
                    text.push_str(&chunk);
                }
                XmlEvent::EndElement { name } => {
                    let closing = name.local_name;
                    match closing.as_str() {
                        "ae_core_density" => data.nc_g = parse_array(&text),
                        "pseudo_core_density" => data.nct_g = parse_array(&text),
                        "ae_core_kinetic_energy_density" => data.tauc_g = parse_array(&text),
                        "pseudo_core_kinetic_energy_density" => {
                            data.tauct_g = parse_array(&text)
                        }
                        "zero_potential" => {
                            data.vbar_g = parse_array(&text);
                            data.e0 = parse_attr(&attrs, "e0").unwrap_or(0.0);
                            data.r0 = parse_attr(&attrs, "r0").unwrap_or(0.0);
                            data.nderiv0 = parse_attr(&attrs, "nderiv0").unwrap_or(0.0) as usize;
                            data.l0 = parse_attr(&attrs, "l0").map(|l| l as usize);
                        }
                        "ae_partial_wave" => {
                            data.phi_jg.push(parse_array(&text));
                            wave_kind += 1;
                        }
                        "pseudo_partial_wave" => data.phit_jg.push(parse_array(&text)),
                        "projector_function" => data.pt_jg.push(parse_array(&text)),
                        "kinetic_energy_differences" => {
                            let flat = parse_array(&text);
                            let nj = (flat.len() as f64).sqrt().round() as usize;
                            data.e_kin_jj = Array2::from_shape_vec(
                                (nj, nj),
                                flat.to_vec(),
                            )
                            .map_err(|_| bad("kinetic matrix not square"))?;
                        }
                        "exact_exchange_X_matrix" => data.x_p = parse_array(&text),
                        "yukawa_exchange_X_matrix" => {
                            data.x_gamma = parse_attr(&attrs, "gamma").unwrap_or(0.0);
                            data.x_pg = Some(parse_array(&text));
                        }
                        "core_hole_state" => {
                            data.ncorehole =
                                parse_attr(&attrs, "n").unwrap_or(0.0) as usize;
                            data.lcorehole =
                                parse_attr(&attrs, "l").unwrap_or(0.0) as usize;
                            data.fcorehole = parse_attr(&attrs, "removed").unwrap_or(0.0);
                            data.phicorehole_g = Some(parse_array(&text));
                        }
                        _ => {}
                    }
                    element.clear();
                }
                _ => {}
            }
        }
        if data.phi_jg.len() != data.l_j.len() || wave_kind != data.l_j.len() {
            return Err(bad("partial-wave count does not match state list"));
        }
        Ok(data)
    }
}

fn write_array(
    f: &mut File,
    name: &str,
    attrs: &[(String, String)],
    a_g: &Array1<f64>,
) -> Result<()> {
    write!(f, "  <{} grid=\"g1\"", name)?;
    for (key, value) in attrs {
        write!(f, " {}=\"{}\"", key, value)?;
    }
    writeln!(f, ">")?;
    write!(f, "   ")?;
    for value in a_g.iter() {
        write!(f, " {:.16e}", value)?;
    }
    writeln!(f)?;
    writeln!(f, "  </{}>", name)?;
    Ok(())
}

fn attr(attrs: &[OwnedAttribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.clone())
}

fn parse_attr(attrs: &[OwnedAttribute], name: &str) -> Option<f64> {
    attr(attrs, name).and_then(|v| v.parse().ok())
}

fn parse_array(text: &str) -> Array1<f64> {
    Array1::from_iter(
        text.split_whitespace()
            .filter_map(|token| token.parse::<f64>().ok()),
    )
}
