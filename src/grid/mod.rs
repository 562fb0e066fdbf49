/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Domain-decomposed uniform 3D grids
//!
//! [`Domain`] maps the communicator onto a 3D process grid;
//! [`GridDescriptor`] assigns grid points to ranks and provides the
//! collective operations (integrate, collect, distribute, symmetrize)
//! that the self-consistency loop uses every iteration.

pub mod descriptor;
pub mod domain;
pub mod errors;

pub use descriptor::{Block, GridDescriptor, TransposePlan};
pub use domain::{decompose_domain, Domain};
pub use errors::{GridError, Result};
