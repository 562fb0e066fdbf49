/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for grid operations

use thiserror::Error;

/// Errors that can occur in domain-decomposition and grid operations
#[derive(Error, Debug)]
pub enum GridError {
    /// The grid cannot be decomposed over the requested process grid.
    /// This is a structural error: the caller must choose a different
    /// process-grid shape (or a different parallelization), it is never
    /// retried.
    #[error("Bad grid: {0}")]
    BadGrid(String),

    /// Grid spacings too anisotropic for central finite differences
    #[error("Very anisotropic grid spacings: {0:?}")]
    AnisotropicGrid([f64; 3]),

    /// A localized-function box crosses a non-periodic boundary
    #[error("Grid bounds error: {0}")]
    GridBounds(String),

    /// Array shape does not match the descriptor
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        got: [usize; 3],
    },

    /// Communicator failure during a collective
    #[error("Communicator error: {0}")]
    Comm(#[from] crate::mpi::CommError),
}

/// A specialized Result type for grid operations
pub type Result<T> = std::result::Result<T, GridError>;
