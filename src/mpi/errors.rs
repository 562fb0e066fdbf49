/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Error types for communicator operations

use thiserror::Error;

/// Errors that can occur in communicator operations
#[derive(Error, Debug)]
pub enum CommError {
    /// A rank argument was outside [0, size)
    #[error("Rank {rank} out of range for communicator of size {size}")]
    RankOutOfRange { rank: usize, size: usize },

    /// A received message did not match the posted buffer size
    #[error("Message size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// Operation is not available on this communicator
    #[error("Unsupported communicator operation: {0}")]
    Unsupported(String),

    /// A peer went away mid-operation
    #[error("Communicator peer disconnected: {0}")]
    Disconnected(String),
}

/// A specialized Result type for communicator operations
pub type Result<T> = std::result::Result<T, CommError>;
