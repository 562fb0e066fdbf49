/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Tests for the distributed grid descriptor
//!
//! The multi-rank cases run on the thread-backed communicator, one OS
//! thread per rank, exercising the same collective code paths an MPI
//! backend would.

use approx::assert_relative_eq;
use gpaw_rs::grid::{GridDescriptor, GridError};
use gpaw_rs::mpi::{serial_comm, Communicator, ThreadWorld};
use ndarray::{array, Array2, Array3};
use rstest::rstest;
use std::sync::Arc;

fn unit_cell(l: f64) -> Array2<f64> {
    array![[l, 0.0, 0.0], [0.0, l, 0.0], [0.0, 0.0, l]]
}

fn make_gd(
    n: usize,
    comm: Arc<dyn Communicator>,
    parsize: Option<[usize; 3]>,
) -> GridDescriptor {
    GridDescriptor::new([n, n, n], unit_cell(n as f64), [true; 3], comm, parsize).unwrap()
}

/// Fill a local array with a value derived from the global index, so the
/// pattern is decomposition-independent
fn fill_global_pattern(gd: &GridDescriptor, a: &mut Array3<f64>) {
    let n = gd.n_local_c;
    for g0 in 0..n[0] {
        for g1 in 0..n[1] {
            for g2 in 0..n[2] {
                let global = [
                    g0 + gd.beg_c[0],
                    g1 + gd.beg_c[1],
                    g2 + gd.beg_c[2],
                ];
                a[(g0, g1, g2)] =
                    (global[0] * 10000 + global[1] * 100 + global[2]) as f64;
            }
        }
    }
}

#[rstest]
#[case([1, 1, 2])]
#[case([2, 1, 1])]
#[case([1, 2, 1])]
#[case([2, 2, 2])]
fn decomposition_covers_every_axis(#[case] parsize: [usize; 3]) {
    let size = parsize[0] * parsize[1] * parsize[2];
    let intervals = ThreadWorld::run(size, move |comm| {
        let gd = make_gd(12, comm, Some(parsize));
        (gd.beg_c, gd.end_c)
    });

    // Union of [beg, end) per axis must cover [0, N) with no overlaps
    for c in 0..3 {
        let mut marks = vec![0usize; 12];
        for (beg, end) in &intervals {
            for g in beg[c]..end[c] {
                marks[g] += 1;
            }
        }
        // Each grid point is claimed once per rank of the perpendicular
        // process plane
        let expected = intervals.len() / parsize[c];
        assert!(marks.iter().all(|&m| m == expected), "axis {}: {:?}", c, marks);
    }
}

#[test]
fn bad_decomposition_is_a_structural_error() {
    let results = ThreadWorld::run(4, |comm| {
        GridDescriptor::new(
            [2, 8, 8],
            unit_cell(8.0),
            [true; 3],
            comm,
            Some([4, 1, 1]),
        )
        .err()
        .map(|e| matches!(e, GridError::BadGrid(_)))
    });
    // 4 ranks cannot each get a slice of 2 points along the first axis
    // (note the anisotropic 2x8x8 grid is also rejected, but the
    // partition failure comes first)
    assert!(results.into_iter().all(|r| r == Some(true)));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
#[case(8)]
fn collect_distribute_roundtrip(#[case] size: usize) {
    let ok = ThreadWorld::run(size, |comm| {
        let gd = make_gd(8, comm, None);
        let mut a = gd.zeros();
        fill_global_pattern(&gd, &mut a);

        let full = gd.collect(&a, false).unwrap();
        let back = gd.distribute(full.as_ref()).unwrap();
        back == a
    });
    assert!(ok.into_iter().all(|x| x));
}

#[rstest]
#[case(1)]
#[case(4)]
fn collect_broadcast_gives_everyone_the_global_array(#[case] size: usize) {
    let results = ThreadWorld::run(size, |comm| {
        let gd = make_gd(4, comm, None);
        let mut a = gd.zeros();
        fill_global_pattern(&gd, &mut a);
        gd.collect(&a, true).unwrap().unwrap()
    });
    for full in &results {
        assert_eq!(full, &results[0]);
        assert_eq!(full[(1, 2, 3)], 10203.0);
    }
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(8)]
fn integrate_is_decomposition_independent(#[case] size: usize) {
    // Global array of ones on N = (8, 8, 8) with a unit cell integrates
    // to dv * 8³ = volume regardless of the process grid
    let results = ThreadWorld::run(size, |comm| {
        let gd = GridDescriptor::new(
            [8, 8, 8],
            unit_cell(1.0),
            [true; 3],
            comm,
            None,
        )
        .unwrap();
        let mut a = gd.zeros();
        a.fill(1.0);
        gd.integrate(&a, true).unwrap()
    });
    for value in results {
        assert_relative_eq!(value, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn integrate_linearity() {
    let gd = make_gd(6, serial_comm(), None);
    let mut a = gd.zeros();
    let mut b = gd.zeros();
    for (i, v) in a.iter_mut().enumerate() {
        *v = (i as f64 * 0.37).sin();
    }
    for (i, v) in b.iter_mut().enumerate() {
        *v = (i as f64 * 0.11).cos();
    }
    let lhs = gd.integrate(&(&a + &b), true).unwrap();
    let rhs = gd.integrate(&a, true).unwrap() + gd.integrate(&b, true).unwrap();
    assert_relative_eq!(lhs, rhs, epsilon = 1e-10);
}

#[test]
fn integrate_pairs_hermitian_matches_full_product() {
    let gd = make_gd(4, serial_comm(), None);
    let mut a = gd.zeros();
    let mut b = gd.zeros();
    for (i, v) in a.iter_mut().enumerate() {
        *v = (i % 5) as f64 - 2.0;
    }
    for (i, v) in b.iter_mut().enumerate() {
        *v = (i % 3) as f64;
    }
    let fns = vec![a, b];
    let full = gd.integrate_pairs(&fns, &fns, false, true).unwrap();
    let herm = gd.integrate_pairs(&fns, &fns, true, true).unwrap();
    for i in 0..2 {
        for j in 0..2 {
            assert_relative_eq!(full[(i, j)], herm[(i, j)], epsilon = 1e-12);
        }
    }
}

#[test]
fn local_integral_skips_the_reduction() {
    let results = ThreadWorld::run(2, |comm| {
        let gd = make_gd(8, comm, None);
        let mut a = gd.zeros();
        a.fill(1.0);
        let local = gd.integrate(&a, false).unwrap();
        let global = gd.integrate(&a, true).unwrap();
        (local, global)
    });
    let total: f64 = results.iter().map(|(local, _)| local).sum();
    for (_, global) in &results {
        assert_relative_eq!(total, *global, epsilon = 1e-12);
    }
}

#[test]
fn coarsen_refine_roundtrip_keeps_cell() {
    let gd = make_gd(8, serial_comm(), None);
    let coarse = gd.coarsen().unwrap();
    let back = coarse.refine().unwrap();
    assert_eq!(gd, back);
    assert_relative_eq!(coarse.dv, 8.0 * gd.dv, epsilon = 1e-12);
}

#[test]
fn distributed_symmetrize_matches_serial() {
    let ops = vec![
        array![[1i64, 0, 0], [0, 1, 0], [0, 0, 1]],
        array![[0i64, 1, 0], [1, 0, 0], [0, 0, 1]],
        array![[-1i64, 0, 0], [0, -1, 0], [0, 0, -1]],
        array![[0i64, -1, 0], [-1, 0, 0], [0, 0, -1]],
    ];

    let serial = {
        let gd = make_gd(4, serial_comm(), None);
        let mut a = gd.zeros();
        fill_global_pattern(&gd, &mut a);
        gd.symmetrize(&mut a, &ops, None).unwrap();
        gd.collect(&a, false).unwrap().unwrap()
    };

    let ops2 = ops.clone();
    let distributed = ThreadWorld::run(4, move |comm| {
        let gd = make_gd(4, comm, None);
        let mut a = gd.zeros();
        fill_global_pattern(&gd, &mut a);
        gd.symmetrize(&mut a, &ops2, None).unwrap();
        gd.collect(&a, false).unwrap()
    });

    let full = distributed
        .into_iter()
        .flatten()
        .next()
        .expect("rank 0 owns the collected array");
    for (x, y) in serial.iter().zip(full.iter()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }
}

/// Equality intentionally compares only locally-known fields; two
/// descriptors over communicators of different size can compare equal on
/// the rank where the local slabs agree.  This pins the documented
/// behavior of the == operator (which must not communicate), it does not
/// bless it as a global-distribution check.
#[test]
fn eq_ignores_remote_distribution() {
    let gd1 = make_gd(8, serial_comm(), None);
    let gd2 = make_gd(8, serial_comm(), Some([1, 1, 1]));
    assert_eq!(gd1, gd2);
}

#[test]
fn get_boxes_covers_the_whole_sphere_volume() {
    let sizes = [1, 2];
    let mut counts = Vec::new();
    for &size in &sizes {
        let per_rank = ThreadWorld::run(size, |comm| {
            let gd = make_gd(8, comm, None);
            let boxes = gd.get_boxes([0.1, 0.5, 0.9], 1.4, true).unwrap();
            boxes
                .iter()
                .map(|(beg, end, _)| {
                    (end[0] - beg[0]) * (end[1] - beg[1]) * (end[2] - beg[2])
                })
                .sum::<usize>()
        });
        counts.push(per_rank.into_iter().sum::<usize>());
    }
    // The union of all ranks' boxes is the same set of grid points no
    // matter how the domain is decomposed
    assert_eq!(counts[0], counts[1]);
    assert!(counts[0] > 0);
}
