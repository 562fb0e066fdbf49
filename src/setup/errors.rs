/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for setup construction and I/O

use thiserror::Error;

/// Errors raised while building or loading setups
#[derive(Error, Debug)]
pub enum SetupError {
    /// The requested setup kind has no implementation in this crate;
    /// the variant exists so callers can dispatch on the closed set.
    #[error("Setup kind {0} is not available here")]
    UnsupportedKind(String),

    /// Functional mismatch between dataset and calculation
    #[error("Cannot use {dataset} setup with {requested} functional")]
    IncompatibleFunctional { dataset: String, requested: String },

    /// Dataset file missing or malformed
    #[error("Bad setup file {path}: {reason}")]
    BadFile { path: String, reason: String },

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Propagated linear-algebra failure
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] crate::utils::UtilsError),

    /// Propagated radial-grid failure
    #[error("Radial grid error: {0}")]
    Radial(#[from] crate::radial::RadialError),

    /// Propagated symmetry failure (rotation-matrix construction)
    #[error("Symmetry error: {0}")]
    Symmetry(#[from] crate::symmetry::SymmetryError),
}

/// A specialized Result type for setup operations
pub type Result<T> = std::result::Result<T, SetupError>;
