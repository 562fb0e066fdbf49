/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Benchmarks for the numerical kernels

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gpaw_rs::gaunt::gaunt;
use gpaw_rs::grid::GridDescriptor;
use gpaw_rs::mpi::serial_comm;
use gpaw_rs::radial::RadialGrid;
use ndarray::array;
use std::f64::consts::PI;

fn bench_radial_poisson(c: &mut Criterion) {
    let rgd = RadialGrid::new(0.4, 1000);
    let n_g = rgd.r_g.mapv(|r| (2.0 / PI).powf(1.5) * (-2.0 * r * r).exp());
    c.bench_function("radial_poisson", |b| {
        b.iter(|| rgd.poisson(black_box(&n_g), 0))
    });
}

fn bench_pseudize(c: &mut Criterion) {
    let rgd = RadialGrid::new(0.4, 1000);
    let a_g = rgd.r_g.mapv(|r| r * (-0.5 * r * r).exp());
    let gc = rgd.ceil(1.2);
    c.bench_function("pseudize", |b| {
        b.iter(|| rgd.pseudize(black_box(&a_g), gc, 1, 6).unwrap())
    });
}

fn bench_grid_integrate(c: &mut Criterion) {
    let gd = GridDescriptor::new(
        [32, 32, 32],
        array![[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
        [true; 3],
        serial_comm(),
        None,
    )
    .unwrap();
    let mut a = gd.zeros();
    for (i, v) in a.iter_mut().enumerate() {
        *v = (i % 17) as f64;
    }
    c.bench_function("grid_integrate_32", |b| {
        b.iter(|| gd.integrate(black_box(&a), true).unwrap())
    });
}

fn bench_gaunt_table(c: &mut Criterion) {
    c.bench_function("gaunt_lmax2", |b| b.iter(|| gaunt(black_box(2))));
}

criterion_group!(
    benches,
    bench_radial_poisson,
    bench_pseudize,
    bench_grid_integrate,
    bench_gaunt_table
);
criterion_main!(benches);
