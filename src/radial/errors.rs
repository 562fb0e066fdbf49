/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for radial-grid operations

use thiserror::Error;

/// Errors that can occur in radial-grid operations
#[derive(Error, Debug)]
pub enum RadialError {
    /// Generic error with a message
    #[error("Radial grid error: {0}")]
    Generic(String),

    /// A pseudization constraint could not be satisfied
    #[error("Pseudization failed: {0}")]
    Pseudize(String),

    /// Propagated linear-algebra failure
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] crate::utils::UtilsError),
}

/// A specialized Result type for radial-grid operations
pub type Result<T> = std::result::Result<T, RadialError>;
