/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! # gpaw-rs
//!
//! A Rust implementation of the projector-augmented-wave (PAW) machinery of
//! the GPAW density-functional-theory code: generation of per-element PAW
//! datasets (partial waves, projectors, compensation charges and the
//! augmentation-sphere correction tensors) and the distributed uniform
//! real-space grid that the self-consistency loop runs on.
//!
//! The crate is organized bottom-up:
//!
//! - [`radial`]: non-uniform radial grids with Poisson/Yukawa solvers and
//!   pseudization,
//! - [`atom`]: the all-electron reference atom,
//! - [`paw`]: the PAW dataset generator,
//! - [`setup`]: assembly of the per-atom correction tensors consumed by a
//!   self-consistency loop,
//! - [`grid`]: domain-decomposed uniform 3D grids with collective
//!   data-movement primitives over an [`mpi`] communicator,
//! - [`symmetry`]: crystal symmetry analysis, k-point reduction and
//!   real-space symmetrization.

pub mod atom;
pub mod cli;
pub mod gaunt;
pub mod grid;
pub mod mpi;
pub mod paw;
pub mod radial;
pub mod setup;
pub mod symmetry;
pub mod utils;
pub mod xc;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
