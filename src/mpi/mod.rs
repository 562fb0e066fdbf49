/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Message-passing communicator abstraction
//!
//! The distributed grid code talks to its parallel environment exclusively
//! through the [`Communicator`] trait: rank/size queries, point-to-point
//! sends (buffered, synchronous and non-blocking), reductions, broadcast,
//! barrier and sub-communicator creation.
//!
//! Two implementations ship with the crate:
//!
//! - [`SerialCommunicator`]: the size-1 world used by single-process runs
//!   and by all of the atomic-dataset machinery,
//! - [`ThreadCommunicator`]: an in-process implementation over channels,
//!   one OS thread per rank, used to exercise the collective semantics
//!   (synchronous-send rendezvous, deterministic receive ordering) in the
//!   test suite.
//!
//! All collective calls are blocking and must be entered by every rank of
//! the communicator in the same order; a mismatched call order across
//! ranks deadlocks.  That discipline belongs to the caller and cannot be
//! verified locally.

pub mod errors;
mod serial;
mod thread;

pub use errors::{CommError, Result};
pub use serial::SerialCommunicator;
pub use thread::{ThreadCommunicator, ThreadWorld};

use std::sync::Arc;

/// Handle for a non-blocking send, completed by [`Communicator::wait`]
#[derive(Debug)]
pub struct Request(pub(crate) u64);

/// Message-passing interface consumed by the grid code
///
/// Only `f64` payloads are exchanged; higher-level code serializes its
/// arrays into contiguous slices before sending.
pub trait Communicator: Send + Sync {
    /// Rank of this process within the communicator
    fn rank(&self) -> usize;

    /// Number of processes in the communicator
    fn size(&self) -> usize;

    /// Blocking (buffered) send
    fn send(&self, data: &[f64], dest: usize, tag: i32) -> Result<()>;

    /// Synchronous send: returns only after the receiver has matched the
    /// message.  Used where many senders could otherwise queue unbounded
    /// amounts of data before the receiver posts its receives.
    fn ssend(&self, data: &[f64], dest: usize, tag: i32) -> Result<()>;

    /// Non-blocking send; the returned request must be passed to
    /// [`Communicator::wait`] before the payload may be reused
    fn isend(&self, data: &[f64], dest: usize, tag: i32) -> Result<Request>;

    /// Complete a non-blocking operation
    fn wait(&self, request: Request) -> Result<()>;

    /// Blocking receive into an exactly-sized buffer
    fn receive(&self, data: &mut [f64], source: usize, tag: i32) -> Result<()>;

    /// In-place element-wise sum over all ranks (allreduce)
    fn sum(&self, data: &mut [f64]) -> Result<()>;

    /// Sum a scalar over all ranks
    fn sum_scalar(&self, value: f64) -> Result<f64> {
        let mut buf = [value];
        self.sum(&mut buf)?;
        Ok(buf[0])
    }

    /// Maximum of a scalar over all ranks
    fn max_scalar(&self, value: f64) -> Result<f64>;

    /// Broadcast from `root` to all ranks, in place
    fn broadcast(&self, data: &mut [f64], root: usize) -> Result<()>;

    /// Block until every rank has entered the barrier
    fn barrier(&self) -> Result<()>;

    /// Create a sub-communicator from an explicit list of ranks (given in
    /// this communicator's numbering).  Collective over the listed ranks;
    /// ranks not listed get `None` back immediately.
    fn new_communicator(&self, ranks: &[usize]) -> Result<Option<Arc<dyn Communicator>>>;
}

/// The default single-process world
pub fn serial_comm() -> Arc<dyn Communicator> {
    Arc::new(SerialCommunicator::new())
}
