/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Size-1 communicator for single-process runs

use super::errors::{CommError, Result};
use super::{Communicator, Request};
use std::sync::Arc;

/// Communicator with a single rank
///
/// Reductions and broadcasts are identities; point-to-point messages have
/// no possible peer and are reported as unsupported.
#[derive(Debug, Default, Clone)]
pub struct SerialCommunicator;

impl SerialCommunicator {
    pub fn new() -> Self {
        SerialCommunicator
    }
}

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, _data: &[f64], dest: usize, _tag: i32) -> Result<()> {
        Err(CommError::RankOutOfRange { rank: dest, size: 1 })
    }

    fn ssend(&self, _data: &[f64], dest: usize, _tag: i32) -> Result<()> {
        Err(CommError::RankOutOfRange { rank: dest, size: 1 })
    }

    fn isend(&self, _data: &[f64], dest: usize, _tag: i32) -> Result<Request> {
        Err(CommError::RankOutOfRange { rank: dest, size: 1 })
    }

    fn wait(&self, _request: Request) -> Result<()> {
        Ok(())
    }

    fn receive(&self, _data: &mut [f64], source: usize, _tag: i32) -> Result<()> {
        Err(CommError::RankOutOfRange { rank: source, size: 1 })
    }

    fn sum(&self, _data: &mut [f64]) -> Result<()> {
        Ok(())
    }

    fn max_scalar(&self, value: f64) -> Result<f64> {
        Ok(value)
    }

    fn broadcast(&self, _data: &mut [f64], root: usize) -> Result<()> {
        if root != 0 {
            return Err(CommError::RankOutOfRange { rank: root, size: 1 });
        }
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn new_communicator(&self, ranks: &[usize]) -> Result<Option<Arc<dyn Communicator>>> {
        if ranks == [0] {
            Ok(Some(Arc::new(SerialCommunicator)))
        } else if ranks.contains(&0) {
            Err(CommError::RankOutOfRange {
                rank: *ranks.iter().max().unwrap(),
                size: 1,
            })
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_identities() {
        let comm = SerialCommunicator::new();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        let mut data = [1.0, 2.0];
        comm.sum(&mut data).unwrap();
        assert_eq!(data, [1.0, 2.0]);
        assert_eq!(comm.sum_scalar(3.5).unwrap(), 3.5);
        assert!(comm.send(&data, 1, 0).is_err());
        assert!(comm.new_communicator(&[0]).unwrap().is_some());
    }
}
