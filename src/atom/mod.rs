/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! The all-electron atomic problem
//!
//! Electronic configurations, the Gaussian basis, per-l channels and the
//! self-consistent [`AllElectronAtom`] that serves as the reference for
//! PAW dataset generation.

pub mod aeatom;
pub mod channel;
pub mod configurations;
pub mod errors;
pub mod gaussian;

pub use aeatom::AllElectronAtom;
pub use channel::Channel;
pub use configurations::{atomic_number, configuration, CHEMICAL_SYMBOLS};
pub use errors::{AtomError, Result};
pub use gaussian::{exponent_ladder, GaussianBasis};
