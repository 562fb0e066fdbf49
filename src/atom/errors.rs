/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for the all-electron atom

use thiserror::Error;

/// Errors that can occur while solving the atomic problem
#[derive(Error, Debug)]
pub enum AtomError {
    /// Unknown chemical symbol
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// Invalid quantum numbers or occupations
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The self-consistency loop did not converge
    #[error("Self-consistency not reached: {0}")]
    NotConverged(String),

    /// Radial integration failure
    #[error("Radial integration failed: {0}")]
    Integration(String),

    /// Propagated xc-kernel failure
    #[error("XC error: {0}")]
    Xc(#[from] crate::xc::XCError),

    /// Propagated linear-algebra failure
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] crate::utils::UtilsError),

    /// Propagated radial-grid failure
    #[error("Radial grid error: {0}")]
    Radial(#[from] crate::radial::RadialError),
}

/// A specialized Result type for atomic calculations
pub type Result<T> = std::result::Result<T, AtomError>;
