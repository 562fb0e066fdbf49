/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Symmetry analysis and k-point reduction tests

use approx::assert_relative_eq;
use gpaw_rs::grid::GridDescriptor;
use gpaw_rs::mpi::serial_comm;
use gpaw_rs::symmetry::Symmetry;
use ndarray::array;
use rstest::rstest;

#[test]
fn cubic_holohedry_has_48_operations() {
    let cell = array![[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]];
    let mut sym = Symmetry::new(vec![14], cell, [true; 3]);
    sym.analyze(&[[0.0, 0.0, 0.0]]);
    assert_eq!(sym.op_scc.len(), 48);
}

#[test]
fn fcc_primitive_cell_has_48_operations() {
    // Symmetry is a property of the lattice and the atoms, not of the
    // chosen cell representation
    let a = 4.05;
    let cell = array![
        [0.0, 0.5 * a, 0.5 * a],
        [0.5 * a, 0.0, 0.5 * a],
        [0.5 * a, 0.5 * a, 0.0]
    ];
    let mut sym = Symmetry::new(vec![13], cell, [true; 3]);
    sym.analyze(&[[0.0, 0.0, 0.0]]);
    assert_eq!(sym.op_scc.len(), 48);
}

#[rstest]
#[case(2)]
#[case(3)]
#[case(4)]
fn kpoint_weights_sum_to_one(#[case] n: usize) {
    let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut sym = Symmetry::new(vec![1], cell, [true; 3]);
    sym.analyze(&[[0.0, 0.0, 0.0]]);

    let mut bzk = Vec::new();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                bzk.push([
                    (2.0 * i as f64 + 1.0 - n as f64) / (2.0 * n as f64),
                    (2.0 * j as f64 + 1.0 - n as f64) / (2.0 * n as f64),
                    (2.0 * k as f64 + 1.0 - n as f64) / (2.0 * n as f64),
                ]);
            }
        }
    }
    let reduction = sym.reduce(&bzk).unwrap();
    assert_relative_eq!(
        reduction.weight_k.iter().sum::<f64>(),
        1.0,
        epsilon = 1e-12
    );
    assert!(reduction.ibz_kc.len() < bzk.len());

    // Every point maps to exactly one irreducible point, consistent with
    // at least one (rotation, time-reversal) pair
    for k in 0..bzk.len() {
        let rep = reduction.ibz2bz_k[reduction.bz2ibz_k[k]];
        let s = reduction.sym_k[k];
        let sign = if reduction.time_reversal_k[k] { -1.0 } else { 1.0 };
        for c in 0..3 {
            let mut mapped = 0.0;
            for c2 in 0..3 {
                mapped += sign * sym.op_scc[s][(c, c2)] as f64 * bzk[rep][c2];
            }
            let mut diff = mapped - bzk[k][c];
            diff -= diff.round();
            assert_relative_eq!(diff, 0.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn reduction_without_symmetry_keeps_time_reversal_only() {
    let cell = array![[1.0, 0.0, 0.0], [0.0, 1.2, 0.0], [0.0, 0.0, 1.4]];
    let mut sym = Symmetry::new(vec![1, 2], cell, [true; 3]);
    // Low-symmetry two-atom arrangement: only identity survives
    sym.analyze(&[[0.0, 0.0, 0.0], [0.11, 0.23, 0.37]]);
    assert_eq!(sym.op_scc.len(), 1);

    // Full 2x2x2 mesh: time reversal pairs k with -k
    let mut bzk: Vec<[f64; 3]> = Vec::new();
    for &x in &[-0.25, 0.25] {
        for &y in &[-0.25, 0.25] {
            for &z in &[-0.25, 0.25] {
                bzk.push([x, y, z]);
            }
        }
    }
    let reduction = sym.reduce(&bzk).unwrap();
    assert_eq!(reduction.ibz_kc.len(), 4);
    assert_relative_eq!(
        reduction.weight_k.iter().sum::<f64>(),
        1.0,
        epsilon = 1e-12
    );
}

#[test]
fn symmetrized_grid_function_is_invariant() {
    let cell = array![[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]];
    let mut sym = Symmetry::new(vec![1], cell.clone(), [true; 3]);
    sym.analyze(&[[0.0, 0.0, 0.0]]);
    sym.check_grid([8, 8, 8]).unwrap();

    let gd = GridDescriptor::new([8, 8, 8], cell, [true; 3], serial_comm(), None).unwrap();
    let mut a = gd.zeros();
    for (i, v) in a.iter_mut().enumerate() {
        *v = ((i * 7919) % 101) as f64;
    }
    sym.symmetrize(&mut a, &gd).unwrap();
    let b = a.clone();
    sym.symmetrize(&mut a, &gd).unwrap();
    // Averaging over the group is a projection: applying it twice
    // changes nothing
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x, y, epsilon = 1e-10);
    }
}

#[test]
fn broken_symmetry_is_detected_not_repaired() {
    let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut sym = Symmetry::new(vec![1, 1], cell, [true; 3]);
    sym.analyze(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]]);
    let nops = sym.op_scc.len();
    assert!(nops > 1);
    // Slightly displaced atom: the cached operations no longer hold
    assert!(sym.check(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.501]]).is_err());
    // The operation list is untouched by the failed check
    assert_eq!(sym.op_scc.len(), nops);
}
