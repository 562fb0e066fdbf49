/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for the utils module

use thiserror::Error;

/// Errors that can occur in the utils module
#[derive(Error, Debug)]
pub enum UtilsError {
    /// Generic error with a message
    #[error("Utility error: {0}")]
    Generic(String),

    /// Math-related errors
    #[error("Math error: {0}")]
    Math(String),

    /// A dense solve hit a (numerically) singular matrix.
    ///
    /// Reported separately from generic failures so that callers can react
    /// to a singular overlap matrix specifically (reduce the projector
    /// count, adjust cutoff radii) instead of treating it as a plain
    /// accuracy failure.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
}

/// A specialized Result type for utils operations
pub type Result<T> = std::result::Result<T, UtilsError>;
