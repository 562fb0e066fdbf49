/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Property tests for the radial-grid numerics

use approx::assert_relative_eq;
use gpaw_rs::radial::RadialGrid;
use gpaw_rs::utils::math::erf;
use rstest::rstest;
use std::f64::consts::PI;

#[rstest]
#[case(0, 2)]
#[case(0, 6)]
#[case(1, 4)]
#[case(2, 6)]
fn pseudization_matches_values_and_derivatives(#[case] l: usize, #[case] nderiv: usize) {
    // For a smooth analytic function the pseudized replacement must agree
    // with the original at the matching window to numerical precision,
    // and its radial derivative must be continuous across the cutoff.
    let rgd = RadialGrid::new(0.4, 600);
    let a_g = rgd
        .r_g
        .mapv(|r| r.powi(l as i32) * (-0.8 * r * r).exp() * (1.0 + 0.3 * r * r));
    let gc = rgd.ceil(1.3);
    let (b_g, _) = rgd.pseudize(&a_g, gc, l, nderiv).unwrap();

    for p in 0..nderiv {
        assert_relative_eq!(b_g[gc + p], a_g[gc + p], max_relative = 1e-10);
    }
    let da = rgd.derivative(&a_g);
    let db = rgd.derivative(&b_g);
    assert_relative_eq!(db[gc + 1], da[gc + 1], max_relative = 1e-8);
}

#[test]
fn normalized_pseudization_keeps_the_norm() {
    let rgd = RadialGrid::new(0.4, 600);
    let a_g = rgd.r_g.mapv(|r| (1.0 + r) * (-1.1 * r).exp());
    let gc = rgd.ceil(0.9);
    let (b_g, _) = rgd.pseudize_normalized(&a_g, gc, 0, 4).unwrap();
    let na = rgd.integrate(&a_g.mapv(|x| x * x), 0);
    let nb = rgd.integrate(&b_g.mapv(|x| x * x), 0);
    assert_relative_eq!(na, nb, max_relative = 1e-9);
    // Matching conditions still hold
    for p in 0..4 {
        assert_relative_eq!(b_g[gc + p], a_g[gc + p], max_relative = 1e-10);
    }
}

#[test]
fn poisson_reproduces_gaussian_potential() {
    let rgd = RadialGrid::new(0.4, 900);
    let alpha = 5.0;
    let n_g = rgd
        .r_g
        .mapv(|r| (alpha / PI).powf(1.5) * (-alpha * r * r).exp());
    let vr_g = rgd.poisson(&n_g, 0);
    for g in (30..600).step_by(41) {
        let r = rgd.r_g[g];
        assert_relative_eq!(vr_g[g], erf(alpha.sqrt() * r), epsilon = 1e-5);
    }
}

#[test]
fn poisson_multipole_tail() {
    // An l = 1 density with dipole moment d gives vr -> 4 pi / 3 d / r
    // outside the charge
    let rgd = RadialGrid::new(0.4, 900);
    let n_g = rgd.r_g.mapv(|r| r * (-3.0 * r * r).exp());
    let vr_g = rgd.poisson(&n_g, 1);
    let moment: f64 = (1..rgd.len())
        .map(|g| n_g[g] * rgd.r_g[g].powi(3) * rgd.dr_g[g])
        .sum();
    for g in (rgd.round(4.0)..rgd.round(12.0)).step_by(60) {
        let r = rgd.r_g[g];
        assert_relative_eq!(
            vr_g[g],
            4.0 * PI / 3.0 * moment / r,
            max_relative = 1e-5
        );
    }
}

#[test]
fn spectral_transform_peaks_at_low_g_for_smooth_functions() {
    let rgd = RadialGrid::new(0.4, 600);
    let smooth = rgd.r_g.mapv(|r: f64| (-0.5 * r * r).exp() * r);
    let (g_k, f_k) = rgd.fft(&smooth);
    assert!(g_k.len() == f_k.len());
    // A Gaussian transforms to a Gaussian: the high-G tail must decay by
    // many orders of magnitude
    let low = f_k[3].abs();
    let high = f_k[f_k.len() / 2].abs();
    assert!(low > 1e3 * high, "low {} high {}", low, high);
}
