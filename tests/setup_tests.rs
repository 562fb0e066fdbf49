/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Setup assembly and round-trip tests

use approx::assert_relative_eq;
use gpaw_rs::paw::{generate, GenerateConfig};
use gpaw_rs::setup::{Setup, SetupData, SetupKind, SetupSource, Setups};
use gpaw_rs::symmetry::Symmetry;
use gpaw_rs::xc::XCKernel;
use ndarray::array;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

// Converging the reference atom is the expensive part; share one dataset
// across the tests of this binary.
static HYDROGEN: Lazy<Arc<SetupData>> = Lazy::new(|| {
    let config = GenerateConfig::from_table("H", "LDA", None).unwrap();
    let mut generator = generate(&config).unwrap();
    Arc::new(generator.make_paw_setup(None).unwrap())
});

fn hydrogen_data() -> Arc<SetupData> {
    HYDROGEN.clone()
}

#[test]
fn setup_invariants() {
    let data = hydrogen_data();
    let setup = Setup::new(data.clone(), 2).unwrap();

    // ni = sum over channels of (2 l + 1)
    let ni: usize = data.l_j.iter().map(|&l| 2 * l + 1).sum();
    assert_eq!(setup.ni, ni);

    // Packed pair index space
    assert_eq!(setup.delta_pl.nrows(), ni * (ni + 1) / 2);
    assert_eq!(setup.delta_pl.ncols(), 9); // (lmax+1)² with lmax = 2

    // dO_ii is symmetric
    for i1 in 0..ni {
        for i2 in 0..ni {
            assert_relative_eq!(
                setup.do_ii[(i1, i2)],
                setup.do_ii[(i2, i1)],
                epsilon = 1e-10
            );
        }
    }

    // M_pp is symmetric
    let np = ni * (ni + 1) / 2;
    for p1 in 0..np {
        for p2 in 0..np {
            assert_relative_eq!(
                setup.m_pp[(p1, p2)],
                setup.m_pp[(p2, p1)],
                max_relative = 1e-8,
                epsilon = 1e-10
            );
        }
    }

    // dC_ii solves dC (1 + B dO) = -dO
    for i1 in 0..ni {
        for i2 in 0..ni {
            let mut lhs = 0.0;
            for k in 0..ni {
                let mut x = if k == i2 { 1.0 } else { 0.0 };
                for k2 in 0..ni {
                    x += setup.b_ii[(k, k2)] * setup.do_ii[(k2, i2)];
                }
                lhs += setup.dc_ii[(i1, k)] * x;
            }
            assert_relative_eq!(lhs, -setup.do_ii[(i1, i2)], epsilon = 1e-9);
        }
    }

    // Projector and partial-wave splines are usable
    assert_eq!(setup.pt_j.len(), setup.nj);
    assert!(setup.vbar.value(0.1).is_finite());
}

#[test]
fn xml_roundtrip_reproduces_setup_tensors() {
    let data = hydrogen_data();
    let dir = tempdir().unwrap();
    let path = dir.path().join(format!("{}.xml", data.filename()));
    data.write_xml(&path).unwrap();
    let reread = SetupData::read_xml(&path).unwrap();

    let s1 = Setup::new(data, 2).unwrap();
    let s2 = Setup::new(Arc::new(reread), 2).unwrap();

    assert_eq!(s1.ni, s2.ni);
    assert_relative_eq!(s1.delta0, s2.delta0, max_relative = 1e-10);
    for p in 0..s1.m_p.len() {
        assert_relative_eq!(s1.m_p[p], s2.m_p[p], max_relative = 1e-8, epsilon = 1e-12);
    }
    for ((p1, p2), v) in s1.m_pp.indexed_iter() {
        assert_relative_eq!(*v, s2.m_pp[(p1, p2)], max_relative = 1e-8, epsilon = 1e-12);
    }
    for i in 0..s1.ni {
        for j in 0..s1.ni {
            assert_relative_eq!(
                s1.do_ii[(i, j)],
                s2.do_ii[(i, j)],
                max_relative = 1e-8,
                epsilon = 1e-12
            );
        }
    }
    assert_relative_eq!(s1.kc, s2.kc, max_relative = 1e-10);
    assert_relative_eq!(s1.e, s2.e, max_relative = 1e-10);
}

#[test]
fn setups_collection_deduplicates() {
    let data = hydrogen_data();
    let mut preloaded = HashMap::new();
    preloaded.insert(1usize, data);
    let source = SetupSource::Preloaded(preloaded);
    let xc = XCKernel::new("LDA").unwrap();

    // H2: two identical atoms share one setup object
    let setups = Setups::new(&[1, 1], &xc, 2, &SetupKind::Paw { tag: None }, &source).unwrap();
    assert_eq!(setups.len(), 2);
    assert!(Arc::ptr_eq(&setups.per_atom[0], &setups.per_atom[1]));

    // Cumulative basis offsets
    assert_eq!(setups.m_a, vec![0, setups.per_atom[0].nao]);
    assert_relative_eq!(setups.nvalence, 2.0, epsilon = 1e-12);

    let fi = setups.projector_indices();
    assert_eq!(fi.max, 2 * setups.per_atom[0].ni);
    assert_eq!(fi.range(1).0, setups.per_atom[0].ni);
}

#[test]
fn setups_symmetry_rotations_are_orthogonal() {
    let data = hydrogen_data();
    let mut preloaded = HashMap::new();
    preloaded.insert(1usize, data);
    let source = SetupSource::Preloaded(preloaded);
    let xc = XCKernel::new("LDA").unwrap();
    let setups = Setups::new(&[1], &xc, 2, &SetupKind::Paw { tag: None }, &source).unwrap();

    let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut symmetry = Symmetry::new(vec![1], cell, [true; 3]);
    symmetry.analyze(&[[0.0, 0.0, 0.0]]);
    setups.set_symmetry(&symmetry).unwrap();

    let setup = &setups.per_atom[0];
    let rotations = setup.rotations().expect("rotations attached");
    assert_eq!(rotations.len(), 48);
    for r_ii in rotations {
        for i1 in 0..setup.ni {
            for i2 in 0..setup.ni {
                let mut s = 0.0;
                for k in 0..setup.ni {
                    s += r_ii[(i1, k)] * r_ii[(i2, k)];
                }
                let expected = if i1 == i2 { 1.0 } else { 0.0 };
                assert_relative_eq!(s, expected, epsilon = 1e-8);
            }
        }
    }
}
