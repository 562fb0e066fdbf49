/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! PAW setups: datasets, correction tensors and per-structure collections
//!
//! [`SetupData`] is the raw dataset (with XML persistence), [`Setup`] the
//! immutable runtime object carrying the correction tensors, and
//! [`Setups`] the deduplicated per-structure collection.  All
//! construction goes through [`create_setup`].

pub mod data;
pub mod errors;
#[allow(clippy::module_inception)]
pub mod setup;
pub mod setups;

pub use data::SetupData;
pub use errors::{Result, SetupError};
pub use setup::Setup;
pub use setups::{create_setup, FunctionIndices, SetupKind, SetupSource, Setups};
