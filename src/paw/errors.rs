/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for PAW dataset generation

use thiserror::Error;

/// Errors raised while generating a PAW dataset
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Terminal failure of a generation run: the produced dataset did not
    /// pass validation, or a pseudization constraint could not be met.
    /// Never retried automatically; the remedy is adjusting the input
    /// parameters (cutoff radii, projector counts) and regenerating.
    #[error("Dataset generation failed: {0}")]
    DatasetGeneration(String),

    /// Unparsable projector specification
    #[error("Invalid projector specification '{0}'")]
    InvalidProjectors(String),

    /// No stored parameters for the requested element variant
    #[error("No dataset parameters for {0}")]
    UnknownDataset(String),

    /// A stage was entered before its prerequisites ran
    #[error("Generator stage ordering violated: {0}")]
    StageOrder(String),

    /// Propagated atomic-solver failure
    #[error("Atom error: {0}")]
    Atom(#[from] crate::atom::AtomError),

    /// Propagated radial-grid failure
    #[error("Radial grid error: {0}")]
    Radial(#[from] crate::radial::RadialError),

    /// Propagated linear-algebra failure
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] crate::utils::UtilsError),

    /// Propagated xc failure
    #[error("XC error: {0}")]
    Xc(#[from] crate::xc::XCError),
}

/// A specialized Result type for dataset generation
pub type Result<T> = std::result::Result<T, GeneratorError>;
