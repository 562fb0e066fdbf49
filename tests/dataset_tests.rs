/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! End-to-end PAW dataset generation tests
//!
//! Slow by design: each test converges a full all-electron atom and
//! builds a complete dataset from it.

use approx::assert_relative_eq;
use gpaw_rs::paw::{generate, GenerateConfig};
use std::f64::consts::PI;

#[test]
fn hydrogen_dataset_biorthogonality_and_check() {
    let config = GenerateConfig::from_table("H", "LDA", None).unwrap();
    let generator = generate(&config).unwrap();

    // <pt_n | phit_m> = delta_nm within each channel
    for waves in &generator.waves_l {
        let n = waves.len();
        for n1 in 0..n {
            for n2 in 0..n {
                let overlap = generator
                    .rgd
                    .integrate(&(&waves.pt_ng[n1] * &waves.phit_ng[n2]), 0)
                    / (4.0 * PI);
                let expected = if n1 == n2 { 1.0 } else { 0.0 };
                assert_relative_eq!(overlap, expected, epsilon = 1e-6);
            }
        }
    }

    assert!(generator.check_all().unwrap());
}

#[test]
fn oxygen_dataset_end_to_end() {
    // The standard O6 table entry: projectors 2s,s,2p,p,d with matched
    // f-scattering local potential at 1.2 Bohr.  check_all enforces the
    // 2 meV bound-state tolerance against the all-electron reference.
    let config = GenerateConfig::from_table("O", "LDA", None).unwrap();
    assert_eq!(config.projectors, "2s,s,2p,p,d,F");
    assert_relative_eq!(config.radii[0], 1.2);

    let mut generator = generate(&config).unwrap();
    assert!(generator.check_all().unwrap());

    // Biorthogonality of the full projector set
    for waves in &generator.waves_l {
        for n1 in 0..waves.len() {
            for n2 in 0..waves.len() {
                let overlap = generator
                    .rgd
                    .integrate(&(&waves.pt_ng[n1] * &waves.phit_ng[n2]), 0)
                    / (4.0 * PI);
                let expected = if n1 == n2 { 1.0 } else { 0.0 };
                assert_relative_eq!(overlap, expected, epsilon = 1e-6);
            }
        }
    }

    // The Hamiltonian correction is symmetric by construction
    for waves in &generator.waves_l {
        for n1 in 0..waves.len() {
            for n2 in 0..waves.len() {
                assert_relative_eq!(
                    waves.dh_nn[(n1, n2)],
                    waves.dh_nn[(n2, n1)],
                    epsilon = 1e-12
                );
            }
        }
    }

    // Core/valence partition of the O6 dataset
    assert_relative_eq!(generator.ncore, 2.0, epsilon = 1e-12);
    assert_relative_eq!(generator.nvalence, 6.0, epsilon = 1e-12);

    // Validation must be re-entrant: the correction matrices are not
    // scaled in place by the check
    let e1 = generator.check(0).unwrap();
    let e2 = generator.check(0).unwrap();
    for (a, b) in e1.iter().zip(&e2) {
        assert_relative_eq!(a, b, epsilon = 1e-13);
    }

    // Logarithmic derivatives of the pseudo atom track the all-electron
    // ones across an energy window around the reference energies.  The
    // curves differ by an integer (the core states' extra nodes), so
    // align them before comparing.
    let energies: Vec<f64> = (0..11).map(|i| -1.0 + 0.15 * i as f64).collect();
    for l in 0..2 {
        let ae = generator
            .aea
            .logarithmic_derivative(l, &energies, 1.3)
            .unwrap();
        let ps = generator.logarithmic_derivative(l, &energies, 1.3).unwrap();
        let shift = (ae[0] - ps[0]).round();
        let error: f64 = ae
            .iter()
            .zip(&ps)
            .map(|(a, p)| (a - shift - p).abs())
            .sum::<f64>()
            / ae.len() as f64;
        assert!(
            error < 0.05,
            "logarithmic-derivative mismatch for l={}: {}",
            l,
            error
        );
    }

    // Convergence diagnostics: looser tolerances never demand a higher
    // cutoff
    let report = generator.convergence_report().unwrap();
    assert_eq!(report.len(), 5);
    for (_, cutoffs) in &report {
        for pair in cutoffs.windows(2) {
            assert!(pair[0].0 >= pair[1].0);
        }
    }

    // Package the dataset and probe the basic invariants
    let data = generator.make_paw_setup(None).unwrap();
    assert_eq!(data.z, 8);
    let ni: usize = data.l_j.iter().map(|&l| 2 * l + 1).sum();
    assert_eq!(ni, 13); // 2s,s -> 2, 2p,p -> 6, d -> 5
    assert_eq!(data.nj(), 5);
    // Bound states come first
    assert!(data.n_j[0] > 0 && data.n_j[1] > 0);
    assert_eq!(data.n_j[data.nj() - 1], -1);
}

