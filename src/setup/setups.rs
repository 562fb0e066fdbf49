/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Setup factory and the per-structure setup collection
//!
//! [`create_setup`] is the sole entry point for constructing a runtime
//! setup; the kind of dataset is a closed enum dispatched in one place.
//! [`Setups`] aggregates the setups of a structure, deduplicating atoms
//! that share (atomic number, kind, basis) and tracking the cumulative
//! basis-function offsets used to assemble per-atom blocks into global
//! matrices.

use super::data::SetupData;
use super::errors::{Result, SetupError};
use super::setup::Setup;
use crate::atom::CHEMICAL_SYMBOLS;
use crate::symmetry::rotation::rotation_matrix;
use crate::symmetry::Symmetry;
use crate::xc::XCKernel;
use log::info;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// The closed set of setup kinds the factory dispatches on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetupKind {
    /// PAW dataset (generated or loaded from file)
    Paw { tag: Option<String> },
    /// Goedecker-Teter-Hutter pseudopotential
    Hgh { semicore: bool },
    /// SG15 optimized norm-conserving pseudopotential
    Sg15,
    /// Basis-set-superposition ghost atom
    Ghost,
    /// Exact all-electron hydrogen setup
    AllElectron,
}

impl fmt::Display for SetupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupKind::Paw { tag: None } => write!(f, "paw"),
            SetupKind::Paw { tag: Some(tag) } => write!(f, "paw:{}", tag),
            SetupKind::Hgh { semicore: false } => write!(f, "hgh"),
            SetupKind::Hgh { semicore: true } => write!(f, "hgh.sc"),
            SetupKind::Sg15 => write!(f, "sg15"),
            SetupKind::Ghost => write!(f, "ghost"),
            SetupKind::AllElectron => write!(f, "ae"),
        }
    }
}

/// Where PAW datasets come from
pub enum SetupSource {
    /// Search these directories for dataset files named like "O.LDA.xml"
    Files(Vec<PathBuf>),
    /// Use pre-built datasets, keyed by atomic number
    Preloaded(HashMap<usize, Arc<SetupData>>),
}

/// The sole factory entry point for runtime setups.
///
/// # Arguments
///
/// * `symbol` - Chemical symbol
/// * `xc` - Functional of the calculation
/// * `lmax` - Compensation-charge expansion cutoff
/// * `kind` - Which dataset family to use
/// * `source` - Dataset lookup for the PAW kind
pub fn create_setup(
    symbol: &str,
    xc: &XCKernel,
    lmax: usize,
    kind: &SetupKind,
    source: &SetupSource,
) -> Result<Setup> {
    match kind {
        SetupKind::Paw { tag } => {
            let data = find_dataset(symbol, xc, tag.as_deref(), source)?;
            if data.setupname != xc.name() {
                return Err(SetupError::IncompatibleFunctional {
                    dataset: data.setupname.clone(),
                    requested: xc.name().to_string(),
                });
            }
            Setup::new(data, lmax)
        }
        // The remaining kinds are interface stubs: their datasets are not
        // parsed by this crate, but the dispatch set is closed so callers
        // can match on a typed error instead of a string.
        other => Err(SetupError::UnsupportedKind(other.to_string())),
    }
}

fn find_dataset(
    symbol: &str,
    xc: &XCKernel,
    tag: Option<&str>,
    source: &SetupSource,
) -> Result<Arc<SetupData>> {
    match source {
        SetupSource::Preloaded(map) => {
            let z = crate::atom::atomic_number(symbol).map_err(|_| SetupError::BadFile {
                path: symbol.to_string(),
                reason: "unknown element".to_string(),
            })?;
            map.get(&z).cloned().ok_or_else(|| SetupError::BadFile {
                path: symbol.to_string(),
                reason: "no preloaded dataset".to_string(),
            })
        }
        SetupSource::Files(dirs) => {
            let stem = match tag {
                Some(tag) => format!("{}.{}.{}.xml", symbol, tag, xc.name()),
                None => format!("{}.{}.xml", symbol, xc.name()),
            };
            for dir in dirs {
                let path = dir.join(&stem);
                if path.exists() {
                    return Ok(Arc::new(SetupData::read_xml(&path)?));
                }
            }
            Err(SetupError::BadFile {
                path: stem,
                reason: "not found in any setup search path".to_string(),
            })
        }
    }
}

/// Cumulative index table for per-atom function blocks
pub struct FunctionIndices {
    /// Offsets, one per atom plus the total
    pub m_a: Vec<usize>,
    /// Total number of functions
    pub max: usize,
}

impl FunctionIndices {
    fn new(counts: impl Iterator<Item = usize>) -> Self {
        let mut m_a = vec![0];
        for count in counts {
            m_a.push(m_a.last().unwrap() + count);
        }
        let max = *m_a.last().unwrap();
        FunctionIndices { m_a, max }
    }

    /// Index range of atom a
    pub fn range(&self, a: usize) -> (usize, usize) {
        (self.m_a[a], self.m_a[a + 1])
    }
}

/// Collection of setups, one per atom, deduplicated per type
pub struct Setups {
    /// Setup of each atom (shared between equal atoms)
    pub per_atom: Vec<Arc<Setup>>,
    /// Identifier of each atom's setup
    pub id_a: Vec<(usize, String)>,
    /// Cumulative basis-function offsets per atom
    pub m_a: Vec<usize>,
    /// Total number of valence electrons
    pub nvalence: f64,
    /// Total number of atomic orbitals
    pub nao: usize,
    /// Summed reference energy
    pub eref: f64,
    /// Total core-hole charge
    pub core_charge: f64,
}

impl Setups {
    /// Build the collection for a structure.
    ///
    /// # Arguments
    ///
    /// * `z_a` - Atomic number per atom
    /// * `xc` - Functional of the calculation
    /// * `lmax` - Compensation-charge expansion cutoff
    /// * `kind` - Setup kind used for every atom
    /// * `source` - Dataset lookup
    pub fn new(
        z_a: &[usize],
        xc: &XCKernel,
        lmax: usize,
        kind: &SetupKind,
        source: &SetupSource,
    ) -> Result<Setups> {
        let mut unique: HashMap<(usize, String), Arc<Setup>> = HashMap::new();
        let mut per_atom = Vec::with_capacity(z_a.len());
        let mut id_a = Vec::with_capacity(z_a.len());
        let mut m_a = Vec::with_capacity(z_a.len());
        let mut cumulative = 0;

        for &z in z_a {
            let id = (z, kind.to_string());
            let setup = match unique.get(&id) {
                Some(setup) => setup.clone(),
                None => {
                    let symbol = CHEMICAL_SYMBOLS[z];
                    let setup = Arc::new(create_setup(symbol, xc, lmax, kind, source)?);
                    unique.insert(id.clone(), setup.clone());
                    setup
                }
            };
            m_a.push(cumulative);
            cumulative += setup.nao;
            id_a.push(id);
            per_atom.push(setup);
        }

        let mut nvalence = 0.0;
        let mut nao = 0;
        let mut eref = 0.0;
        let mut core_charge = 0.0;
        for setup in &per_atom {
            nvalence += setup.nv_electrons;
            nao += setup.nao;
            eref += setup.e;
            core_charge += setup.z as f64 - setup.nv_electrons - setup.nc_electrons;
        }
        info!(
            "Setups: {} atoms, {} unique, {} orbitals, {} valence electrons",
            z_a.len(),
            unique.len(),
            nao,
            nvalence
        );

        Ok(Setups {
            per_atom,
            id_a,
            m_a,
            nvalence,
            nao,
            eref,
            core_charge,
        })
    }

    /// Number of atoms
    pub fn len(&self) -> usize {
        self.per_atom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_atom.is_empty()
    }

    /// Attach rotation matrices for the symmetry operations to every
    /// distinct setup
    pub fn set_symmetry(&self, symmetry: &Symmetry) -> Result<()> {
        let mut r_slmm = Vec::with_capacity(symmetry.op_scc.len());
        for op_cc in &symmetry.op_scc {
            // Rotation in Cartesian coordinates
            let op_vv = symmetry.cartesian_operation(op_cc);
            let mut r_lmm = Vec::with_capacity(4);
            for l in 0..4 {
                r_lmm.push(rotation_matrix(l, &op_vv)?);
            }
            r_slmm.push(r_lmm);
        }

        let mut seen: Vec<*const Setup> = Vec::new();
        for setup in &self.per_atom {
            let ptr = Arc::as_ptr(setup);
            if !seen.contains(&ptr) {
                setup.calculate_rotations(&r_slmm);
                seen.push(ptr);
            }
        }
        Ok(())
    }

    /// Offsets of the atomic-orbital blocks
    pub fn basis_indices(&self) -> FunctionIndices {
        FunctionIndices::new(self.per_atom.iter().map(|s| s.nao))
    }

    /// Offsets of the projector blocks
    pub fn projector_indices(&self) -> FunctionIndices {
        FunctionIndices::new(self.per_atom.iter().map(|s| s.ni))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kinds_are_typed() {
        let xc = XCKernel::new("LDA").unwrap();
        let source = SetupSource::Files(vec![]);
        for kind in [
            SetupKind::Hgh { semicore: false },
            SetupKind::Sg15,
            SetupKind::Ghost,
            SetupKind::AllElectron,
        ] {
            match create_setup("H", &xc, 0, &kind, &source) {
                Err(SetupError::UnsupportedKind(name)) => {
                    assert_eq!(name, kind.to_string());
                }
                _ => panic!("expected UnsupportedKind for {}", kind),
            }
        }
    }

    #[test]
    fn test_missing_file_reported() {
        let xc = XCKernel::new("LDA").unwrap();
        let source = SetupSource::Files(vec![PathBuf::from("/nonexistent")]);
        let kind = SetupKind::Paw { tag: None };
        assert!(matches!(
            create_setup("O", &xc, 0, &kind, &source),
            Err(SetupError::BadFile { .. })
        ));
    }

    #[test]
    fn test_function_indices() {
        let fi = FunctionIndices::new([4, 9, 4].into_iter());
        assert_eq!(fi.max, 17);
        assert_eq!(fi.range(1), (4, 13));
    }
}
