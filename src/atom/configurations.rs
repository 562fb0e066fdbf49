/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Ground-state electronic configurations
//!
//! Aufbau filling with the usual transition-metal and lanthanide
//! exceptions patched in.  Occupations are spin-summed.

use super::errors::{AtomError, Result};

/// Chemical symbols indexed by atomic number (index 0 unused)
pub const CHEMICAL_SYMBOLS: [&str; 105] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf",
];

/// Aufbau filling order as (n, l) pairs
const AUFBAU: [(usize, usize); 19] = [
    (1, 0),
    (2, 0),
    (2, 1),
    (3, 0),
    (3, 1),
    (4, 0),
    (3, 2),
    (4, 1),
    (5, 0),
    (4, 2),
    (5, 1),
    (6, 0),
    (4, 3),
    (5, 2),
    (6, 1),
    (7, 0),
    (5, 3),
    (6, 2),
    (7, 1),
];

/// Occupation adjustments for elements that deviate from strict aufbau
/// filling: (Z, [(n, l, delta_f), ...])
const EXCEPTIONS: [(usize, [(usize, usize, f64); 2]); 19] = [
    (24, [(4, 0, -1.0), (3, 2, 1.0)]),  // Cr
    (29, [(4, 0, -1.0), (3, 2, 1.0)]),  // Cu
    (41, [(5, 0, -1.0), (4, 2, 1.0)]),  // Nb
    (42, [(5, 0, -1.0), (4, 2, 1.0)]),  // Mo
    (44, [(5, 0, -1.0), (4, 2, 1.0)]),  // Ru
    (45, [(5, 0, -1.0), (4, 2, 1.0)]),  // Rh
    (46, [(5, 0, -2.0), (4, 2, 2.0)]),  // Pd
    (47, [(5, 0, -1.0), (4, 2, 1.0)]),  // Ag
    (57, [(4, 3, -1.0), (5, 2, 1.0)]),  // La
    (58, [(4, 3, -1.0), (5, 2, 1.0)]),  // Ce
    (64, [(4, 3, -1.0), (5, 2, 1.0)]),  // Gd
    (78, [(6, 0, -1.0), (5, 2, 1.0)]),  // Pt
    (79, [(6, 0, -1.0), (5, 2, 1.0)]),  // Au
    (89, [(5, 3, -1.0), (6, 2, 1.0)]),  // Ac
    (90, [(5, 3, -2.0), (6, 2, 2.0)]),  // Th
    (91, [(5, 3, -1.0), (6, 2, 1.0)]),  // Pa
    (92, [(5, 3, -1.0), (6, 2, 1.0)]),  // U
    (93, [(5, 3, -1.0), (6, 2, 1.0)]),  // Np
    (96, [(5, 3, -1.0), (6, 2, 1.0)]),  // Cm
];

/// Atomic number of a chemical symbol
pub fn atomic_number(symbol: &str) -> Result<usize> {
    CHEMICAL_SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .filter(|&z| z > 0)
        .ok_or_else(|| AtomError::UnknownElement(symbol.to_string()))
}

/// Ground-state configuration of element Z as (n, l, f) entries,
/// in aufbau order
pub fn configuration(z: usize) -> Result<Vec<(usize, usize, f64)>> {
    if z == 0 || z >= CHEMICAL_SYMBOLS.len() {
        return Err(AtomError::UnknownElement(format!("Z={}", z)));
    }
    let mut entries: Vec<(usize, usize, f64)> = Vec::new();
    let mut remaining = z as f64;
    for &(n, l) in AUFBAU.iter() {
        if remaining <= 0.0 {
            break;
        }
        let capacity = 2.0 * (2 * l + 1) as f64;
        let f = remaining.min(capacity);
        entries.push((n, l, f));
        remaining -= f;
    }

    for &(ze, adjustments) in EXCEPTIONS.iter() {
        if ze != z {
            continue;
        }
        for &(n, l, df) in adjustments.iter() {
            if let Some(entry) = entries.iter_mut().find(|e| e.0 == n && e.1 == l) {
                entry.2 += df;
            } else if df > 0.0 {
                entries.push((n, l, df));
            }
        }
        entries.retain(|e| e.2 > 0.0);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert_eq!(atomic_number("H").unwrap(), 1);
        assert_eq!(atomic_number("O").unwrap(), 8);
        assert_eq!(atomic_number("Cu").unwrap(), 29);
        assert!(atomic_number("Xx").is_err());
    }

    #[test]
    fn test_electron_counts() {
        for z in 1..100 {
            let total: f64 = configuration(z).unwrap().iter().map(|e| e.2).sum();
            assert_eq!(total, z as f64, "Z={}", z);
        }
    }

    #[test]
    fn test_oxygen() {
        let cfg = configuration(8).unwrap();
        assert_eq!(cfg, vec![(1, 0, 2.0), (2, 0, 2.0), (2, 1, 4.0)]);
    }

    #[test]
    fn test_copper_exception() {
        let cfg = configuration(29).unwrap();
        let f4s = cfg.iter().find(|e| e.0 == 4 && e.1 == 0).unwrap().2;
        let f3d = cfg.iter().find(|e| e.0 == 3 && e.1 == 2).unwrap().2;
        assert_eq!(f4s, 1.0);
        assert_eq!(f3d, 10.0);
    }

    #[test]
    fn test_palladium_drops_5s() {
        let cfg = configuration(46).unwrap();
        assert!(cfg.iter().all(|e| !(e.0 == 5 && e.1 == 0)));
        let f4d = cfg.iter().find(|e| e.0 == 4 && e.1 == 2).unwrap().2;
        assert_eq!(f4d, 10.0);
    }
}
