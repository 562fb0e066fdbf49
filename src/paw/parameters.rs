/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Curated generator parameters per element
//!
//! Each entry is keyed by symbol plus valence-electron count (e.g. "O6")
//! and carries the projector specification and the cutoff radii that are
//! known to produce accurate datasets.  The `default`/`semicore` tables
//! select which entry an element uses.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Stored generator input for one element variant
#[derive(Debug, Clone)]
pub struct DatasetParameters {
    /// Projector specification, e.g. "2s,s,2p,p,d,F"
    pub projectors: &'static str,
    /// Cutoff radii per angular momentum (the last one repeats)
    pub radii: &'static [f64],
    /// Override for the local-potential matching radius
    pub r0: Option<f64>,
}

macro_rules! entry {
    ($proj:expr, $radii:expr) => {
        DatasetParameters {
            projectors: $proj,
            radii: $radii,
            r0: None,
        }
    };
    ($proj:expr, $radii:expr, $r0:expr) => {
        DatasetParameters {
            projectors: $proj,
            radii: $radii,
            r0: Some($r0),
        }
    };
}

/// The parameter table, keyed by symbol + electron count
pub static PARAMETERS: Lazy<HashMap<&'static str, DatasetParameters>> = Lazy::new(|| {
    let mut p = HashMap::new();
    // 1-2:
    p.insert("H1", entry!("1s,s,p", &[0.9]));
    p.insert("He2", entry!("1s,s,p", &[1.5]));
    // 3-10:
    p.insert("Li1", entry!("2s,s,2p", &[2.1]));
    p.insert("Li3", entry!("1s,2s,2p,p,d", &[1.5]));
    p.insert("Be2", entry!("2s,s,2p", &[1.5]));
    p.insert("Be4", entry!("1s,2s,2p,p,d", &[1.4]));
    p.insert("B3", entry!("2s,s,2p,p,d", &[1.2]));
    p.insert("C4", entry!("2s,s,2p,p,d", &[1.2]));
    p.insert("N5", entry!("2s,s,2p,p,d", &[1.2, 1.3], 1.1));
    p.insert("O6", entry!("2s,s,2p,p,d,F", &[1.2]));
    p.insert("F7", entry!("2s,s,2p,p,d", &[1.2, 1.4]));
    p.insert("Ne8", entry!("2s,s,2p,p,d", &[1.8]));
    // 11-18:
    p.insert("Na1", entry!("3s,s,3p", &[2.6]));
    p.insert("Na9", entry!("2s,3s,2p,3p,d,F", &[2.3]));
    p.insert("Mg2", entry!("3s,s,3p,D", &[2.6]));
    p.insert("Mg10", entry!("2s,3s,2p,3p,d,F", &[2.0, 1.8]));
    p.insert("Al3", entry!("3s,s,3p,p,d,F", &[2.1]));
    p.insert("Si4", entry!("3s,s,3p,p,d,F", &[1.9]));
    p.insert("P5", entry!("3s,s,3p,p,d,F", &[1.7]));
    p.insert("S6", entry!("3s,s,3p,p,d,F", &[1.6]));
    p.insert("Cl7", entry!("3s,s,3p,p,d,F", &[1.5]));
    p.insert("Ar8", entry!("3s,s,3p,p,d,F", &[1.5]));
    // 19-36:
    p.insert("K1", entry!("4s,s,4p,D", &[3.5]));
    p.insert("K9", entry!("3s,4s,3p,4p,d,d,F", &[2.1]));
    p.insert("Ca2", entry!("4s,s,4p", &[3.1]));
    p.insert("Ca10", entry!("3s,4s,3p,4p,3d,d,F", &[2.1]));
    p.insert("Sc3", entry!("4s,s,4p,p,3d,d", &[2.7]));
    p.insert("Sc11", entry!("3s,4s,3p,4p,3d,d,F", &[2.3]));
    p.insert("Ti4", entry!("4s,s,4p,p,3d,d", &[2.7]));
    p.insert("Ti12", entry!("3s,4s,3p,4p,3d,d,F", &[2.2, 2.2, 2.3]));
    p.insert("V5", entry!("4s,s,4p,p,3d,d", &[2.6]));
    p.insert("V13", entry!("3s,4s,3p,4p,3d,d,F", &[2.1, 2.1, 2.3]));
    p.insert("Cr6", entry!("4s,s,4p,p,3d,d", &[2.5]));
    p.insert("Cr14", entry!("3s,4s,3p,4p,3d,d,F", &[2.1, 2.1, 2.3]));
    p.insert("Mn7", entry!("4s,s,4p,p,3d,d", &[2.4]));
    p.insert("Mn15", entry!("3s,4s,3p,4p,3d,d,F", &[2.0, 2.0, 2.2]));
    p.insert("Fe8", entry!("4s,s,4p,p,3d,d", &[2.2]));
    p.insert("Fe16", entry!("3s,4s,3p,4p,3d,d,F", &[2.1]));
    p.insert("Co9", entry!("4s,s,4p,p,3d,d", &[2.2]));
    p.insert("Co17", entry!("3s,4s,3p,4p,3d,d,F", &[2.1]));
    p.insert("Ni10", entry!("4s,s,4p,p,3d,d", &[2.1]));
    p.insert("Ni18", entry!("3s,4s,3p,4p,3d,d,F", &[2.0]));
    p.insert("Cu11", entry!("4s,s,4p,p,3d,d", &[2.1]));
    p.insert("Cu19", entry!("3s,4s,3p,4p,3d,d,F", &[1.9]));
    p.insert("Zn12", entry!("4s,s,4p,p,3d", &[2.1]));
    p.insert("Zn20", entry!("3s,4s,3p,4p,3d,d,F", &[1.9]));
    p.insert("Ga3", entry!("4s,s,4p,p,d,F", &[2.2]));
    p.insert("Ga13", entry!("4s,s,4p,p,3d,d,F", &[2.2]));
    p.insert("Ge4", entry!("4s,s,4p,p,d,F", &[2.1]));
    p.insert("Ge14", entry!("4s,s,4p,p,3d,d,F", &[2.1]));
    p.insert("As5", entry!("4s,s,4p,p,d,F", &[2.0]));
    p.insert("Se6", entry!("4s,s,4p,p,d,F", &[2.1]));
    p.insert("Br7", entry!("4s,s,4p,p,d,F", &[2.1]));
    p.insert("Kr8", entry!("4s,s,4p,p,d,F", &[2.1]));
    // 37-54:
    p.insert("Rb1", entry!("5s,s,5p", &[3.6]));
    p.insert("Rb9", entry!("4s,5s,4p,5p,d,d,F", &[2.5]));
    p.insert("Sr2", entry!("5s,s,5p", &[3.3]));
    p.insert("Sr10", entry!("4s,5s,4p,5p,4d,d,F", &[2.5]));
    p.insert("Y3", entry!("5s,s,5p,p,4d,d", &[3.1]));
    p.insert("Y11", entry!("4s,5s,4p,5p,4d,d,F", &[2.5]));
    p.insert("Zr4", entry!("5s,s,5p,p,4d,d", &[3.0]));
    p.insert("Zr12", entry!("4s,5s,4p,5p,4d,d,F", &[2.5]));
    p.insert("Nb5", entry!("5s,s,5p,p,4d,d", &[2.9]));
    p.insert("Nb13", entry!("4s,5s,4p,5p,4d,d,F", &[2.4, 2.4, 2.5]));
    p.insert("Mo6", entry!("5s,s,5p,p,4d,d", &[2.8]));
    p.insert("Mo14", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("Tc7", entry!("5s,s,5p,p,4d,d", &[2.7]));
    p.insert("Tc15", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("Ru8", entry!("5s,s,5p,p,4d,d", &[2.6]));
    p.insert("Ru16", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("Rh9", entry!("5s,s,5p,p,4d,d", &[2.5]));
    p.insert("Rh17", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("Pd10", entry!("5s,s,5p,p,4d,d", &[2.4]));
    p.insert("Pd18", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("Ag11", entry!("5s,s,5p,p,4d,d", &[2.4]));
    p.insert("Ag19", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("Cd12", entry!("5s,s,5p,p,4d,d", &[2.4]));
    p.insert("Cd20", entry!("4s,5s,4p,5p,4d,d,F", &[2.3]));
    p.insert("In13", entry!("5s,s,5p,p,4d,d,F", &[2.6]));
    p.insert("Sn14", entry!("5s,s,5p,p,4d,d,F", &[2.5]));
    p.insert("Sb15", entry!("5s,s,5p,p,4d,d,F", &[2.5]));
    p.insert("Te6", entry!("5s,6s,5p,p,d,d,F", &[2.5]));
    p.insert("I7", entry!("5s,s,5p,p,d,F", &[2.4]));
    p.insert("Xe8", entry!("5s,s,5p,p,d,F", &[2.3]));
    // 55-56:
    p.insert("Cs1", entry!("6s,s,6p,5d", &[4.3, 4.6, 4.0]));
    p.insert("Cs9", entry!("5s,6s,5p,6p,5d,0.5d,F", &[3.2]));
    p.insert("Ba2", entry!("6s,s,6p,5d", &[3.9]));
    p.insert("Ba10", entry!("5s,6s,5p,6p,5d,d,F", &[2.2]));
    // 57-71:
    p.insert("La11", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.5]));
    p.insert("Ce12", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.4]));
    p.insert("Pr13", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.3]));
    p.insert("Nd14", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.3]));
    p.insert("Pm15", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.3]));
    p.insert("Sm16", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Eu17", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Gd18", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Tb19", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Dy20", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.1]));
    p.insert("Ho21", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Er22", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Tm23", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Yb24", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    p.insert("Lu25", entry!("5s,6s,5p,6p,5d,d,4f,f,G", &[2.2]));
    // 72-86:
    p.insert("Hf4", entry!("6s,s,6p,p,5d,d", &[2.9]));
    p.insert("Hf12", entry!("5s,6s,5p,6p,5d,d,F", &[2.4]));
    p.insert("Ta5", entry!("6s,s,6p,p,5d,d", &[2.8]));
    p.insert("Ta13", entry!("5s,6s,5p,6p,5d,d,F", &[2.4]));
    p.insert("W6", entry!("6s,s,6p,p,5d,d", &[2.7]));
    p.insert("W14", entry!("5s,6s,5p,6p,5d,d,F", &[2.4]));
    p.insert("Re7", entry!("6s,s,6p,p,5d,d", &[2.6]));
    p.insert("Re15", entry!("5s,6s,5p,6p,5d,d,F", &[2.4]));
    p.insert("Os8", entry!("6s,s,6p,p,5d,d", &[2.6]));
    p.insert("Os16", entry!("5s,6s,5p,6p,5d,d,F", &[2.4]));
    p.insert("Ir9", entry!("6s,s,6p,p,5d,d", &[2.6]));
    p.insert("Ir17", entry!("5s,6s,5p,6p,5d,d,F", &[2.4]));
    p.insert("Pt10", entry!("6s,s,6p,p,5d,d", &[2.5]));
    p.insert("Pt18", entry!("5s,6s,5p,6p,5d,d,F", &[2.3]));
    p.insert("Au11", entry!("6s,s,6p,p,5d,d", &[2.5]));
    p.insert("Au19", entry!("5s,6s,5p,6p,5d,d,F", &[2.3]));
    p.insert("Hg12", entry!("6s,s,6p,p,5d,d", &[2.5]));
    p.insert("Hg20", entry!("5s,6s,5p,6p,5d,d,F", &[2.3]));
    p.insert("Tl13", entry!("6s,s,6p,p,5d,d,F", &[2.8]));
    p.insert("Pb14", entry!("6s,s,6p,p,5d,d,F", &[2.6]));
    p.insert("Bi5", entry!("6s,s,6p,p,d,F", &[2.8]));
    p.insert("Bi15", entry!("6s,s,6p,p,5d,d,F", &[2.6]));
    p.insert("Po6", entry!("6s,s,6p,p,d,F", &[2.7]));
    p.insert("At7", entry!("6s,s,6p,p,d,F", &[2.6]));
    p.insert("Rn8", entry!("6s,s,6p,p,d,F", &[2.6]));
    // 87-88:
    p.insert("Fr1", entry!("6s,s,6p,5d", &[4.5]));
    p.insert("Fr9", entry!("6s,7s,6p,7p,6d,d,F", &[2.7, 2.5]));
    p.insert("Ra2", entry!("6s,s,6p,5d", &[4.5]));
    p.insert("Ra10", entry!("6s,7s,6p,7p,6d,d,F", &[2.7, 2.5]));
    // 89-102:
    p.insert("Ac11", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Th12", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.4]));
    p.insert("Pa13", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("U14", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Np15", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Pu16", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Am17", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Cm18", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Bk19", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Cf20", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Es21", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Fm22", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("Md23", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p.insert("No24", entry!("6s,7s,6p,7p,6d,d,5f,f,G", &[2.5]));
    p
});

/// Valence-electron count of the standard dataset per atomic number
pub const DEFAULT_ELECTRONS: [usize; 103] = [
    0, 1, 2, 1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11,
    12, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 6, 7, 8, 1, 2, 11,
    12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14,
    15, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
];

/// Valence-electron count of the semicore dataset per atomic number
pub const SEMICORE_ELECTRONS: [usize; 103] = [
    0, 1, 2, 3, 4, 3, 4, 5, 6, 7, 8, 9, 10, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17,
    18, 19, 20, 13, 14, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 13, 14, 15, 6,
    7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 12, 13, 14, 15, 16,
    17, 18, 19, 20, 13, 14, 15, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 13, 14,
    15, 6,
];

/// Look up the parameter-table entry for a symbol and optional electron
/// count (defaults to the standard dataset)
pub fn get_parameters(symbol: &str, electrons: Option<usize>) -> Option<&'static DatasetParameters> {
    let z = crate::atom::atomic_number(symbol).ok()?;
    let ne = electrons.unwrap_or(DEFAULT_ELECTRONS[z]);
    let key = format!("{}{}", symbol, ne);
    PARAMETERS.get(key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oxygen_default_entry() {
        let par = get_parameters("O", None).unwrap();
        assert_eq!(par.projectors, "2s,s,2p,p,d,F");
        assert_eq!(par.radii, &[1.2]);
    }

    #[test]
    fn test_nitrogen_r0_override() {
        let par = get_parameters("N", None).unwrap();
        assert_eq!(par.r0, Some(1.1));
    }

    #[test]
    fn test_semicore_table_consistency() {
        // Every semicore count that differs from the default must have a
        // table entry of its own for the light elements
        for symbol in ["Li", "Na", "Mg", "K", "Ca"] {
            let z = crate::atom::atomic_number(symbol).unwrap();
            let key = format!("{}{}", symbol, SEMICORE_ELECTRONS[z]);
            assert!(PARAMETERS.contains_key(key.as_str()), "{}", key);
        }
    }
}
