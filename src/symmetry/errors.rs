/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for symmetry analysis

use thiserror::Error;

/// Errors raised by symmetry analysis and its consumers
#[derive(Error, Debug)]
pub enum SymmetryError {
    /// Atomic positions no longer satisfy previously determined
    /// operations; the structure changed in a way inconsistent with the
    /// cached symmetry data and `analyze` must be re-run.
    #[error("Broken symmetry!")]
    BrokenSymmetry,

    /// A symmetry operation does not map the real-space grid onto itself
    #[error("Real space grid not compatible with symmetry operation: {0}")]
    IncommensurateGrid(String),

    /// Inconsistent k-point mapping (duplicate points in the mesh)
    #[error("Bad k-point mesh: {0}")]
    KPointMapping(String),

    /// Propagated grid failure during symmetrization
    #[error("Grid error: {0}")]
    Grid(#[from] crate::grid::GridError),

    /// Propagated linear-algebra failure
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] crate::utils::UtilsError),
}

/// A specialized Result type for symmetry operations
pub type Result<T> = std::result::Result<T, SymmetryError>;
