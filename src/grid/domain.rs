/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Process-grid decomposition of the unit cell
//!
//! A [`Domain`] maps the communicator onto a 3D grid of processes in
//! row-major order and knows each rank's position and neighbors.  The
//! [`crate::grid::GridDescriptor`] builds on it to assign grid points.

use super::errors::{GridError, Result};
use crate::mpi::Communicator;
use ndarray::Array2;
use std::fmt;
use std::sync::Arc;

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("cell_cv", &self.cell_cv)
            .field("icell_cv", &self.icell_cv)
            .field("pbc_c", &self.pbc_c)
            .field("comm_size", &self.comm.size())
            .field("parsize_c", &self.parsize_c)
            .field("parpos_c", &self.parpos_c)
            .finish()
    }
}

/// Decomposition of a unit cell over a 3D process grid
pub struct Domain {
    /// Cell vectors as rows, in Bohr
    pub cell_cv: Array2<f64>,
    /// Inverse of the cell matrix (columns are reciprocal vectors / 2pi)
    pub icell_cv: Array2<f64>,
    /// Periodic boundary conditions per axis
    pub pbc_c: [bool; 3],
    /// Communicator for domain decomposition
    pub comm: Arc<dyn Communicator>,
    /// Number of domains along each axis
    pub parsize_c: [usize; 3],
    /// This rank's position in the process grid
    pub parpos_c: [usize; 3],
}

impl Domain {
    /// Construct a domain decomposition.
    ///
    /// # Arguments
    ///
    /// * `cell_cv` - 3x3 cell matrix (rows are lattice vectors, Bohr)
    /// * `pbc_c` - Periodic boundary flags
    /// * `comm` - Communicator whose size the process grid must match
    /// * `parsize_c` - Explicit process-grid shape, or None to choose one
    /// * `n_c` - Global grid point counts, used to balance the automatic
    ///   choice
    pub fn new(
        cell_cv: Array2<f64>,
        pbc_c: [bool; 3],
        comm: Arc<dyn Communicator>,
        parsize_c: Option<[usize; 3]>,
        n_c: [usize; 3],
    ) -> Result<Self> {
        if cell_cv.dim() != (3, 3) {
            return Err(GridError::BadGrid(format!(
                "cell must be 3x3, got {:?}",
                cell_cv.dim()
            )));
        }

        let parsize_c = match parsize_c {
            Some(p) => {
                if p[0] * p[1] * p[2] != comm.size() {
                    return Err(GridError::BadGrid(format!(
                        "Process grid {}x{}x{} does not match communicator size {}",
                        p[0],
                        p[1],
                        p[2],
                        comm.size()
                    )));
                }
                p
            }
            None => decompose_domain(n_c, comm.size()),
        };

        let icell_cv = invert3(&cell_cv)?;
        let rank = comm.rank();
        let parpos_c = position_from_rank(rank, parsize_c);

        Ok(Domain {
            cell_cv,
            icell_cv,
            pbc_c,
            comm,
            parsize_c,
            parpos_c,
        })
    }

    /// Rank holding the given process-grid position (row-major order)
    pub fn rank_from_position(&self, pos_c: [usize; 3]) -> usize {
        (pos_c[0] * self.parsize_c[1] + pos_c[1]) * self.parsize_c[2] + pos_c[2]
    }

    /// Process-grid position of the given rank
    pub fn position_from_rank(&self, rank: usize) -> [usize; 3] {
        position_from_rank(rank, self.parsize_c)
    }

    /// Neighbor ranks (negative and positive direction) along `axis`
    ///
    /// At a non-periodic domain edge the neighbor is `None`; with periodic
    /// boundaries the process grid wraps around.  These are the peers a
    /// halo exchange communicates with.
    pub fn neighbors(&self, axis: usize) -> [Option<usize>; 2] {
        let p = self.parsize_c[axis];
        let pos = self.parpos_c[axis];
        let mut result = [None, None];
        for (i, step) in [-1i64, 1i64].iter().enumerate() {
            let neighbor = pos as i64 + step;
            if (0..p as i64).contains(&neighbor) || self.pbc_c[axis] {
                let mut pos_c = self.parpos_c;
                pos_c[axis] = neighbor.rem_euclid(p as i64) as usize;
                result[i] = Some(self.rank_from_position(pos_c));
            }
        }
        result
    }

    /// Communicator connecting the domains along one axis
    ///
    /// Used by redistribution operations that move planes along a single
    /// direction.  Collective over all ranks of the domain communicator.
    pub fn axial_communicator(
        &self,
        axis: usize,
    ) -> Result<Option<Arc<dyn Communicator>>> {
        let mut peers = Vec::with_capacity(self.parsize_c[axis]);
        let mut pos_c = self.parpos_c;
        for i in 0..self.parsize_c[axis] {
            pos_c[axis] = i;
            peers.push(self.rank_from_position(pos_c));
        }
        Ok(self.comm.new_communicator(&peers)?)
    }
}

/// Pick a process-grid shape for `size` ranks balancing the local boxes
///
/// Among all factorizations p0*p1*p2 = size, minimize the total area of
/// the cut planes, (p_c - 1) times the perpendicular cross section summed
/// over the axes.  That prefers cubic sub-domains over slabs and avoids
/// splitting short axes.  Ties go to the first factorization in
/// lexicographic order, so the choice is deterministic.
pub fn decompose_domain(n_c: [usize; 3], size: usize) -> [usize; 3] {
    let mut best = [size, 1, 1];
    let mut best_cost = f64::INFINITY;
    for p0 in 1..=size {
        if size % p0 != 0 {
            continue;
        }
        let rest = size / p0;
        for p1 in 1..=rest {
            if rest % p1 != 0 {
                continue;
            }
            let p2 = rest / p1;
            let p = [p0, p1, p2];
            let mut cost = 0.0;
            for c in 0..3 {
                let area = n_c[(c + 1) % 3] as f64 * n_c[(c + 2) % 3] as f64;
                cost += (p[c] - 1) as f64 * area;
            }
            if cost < best_cost {
                best_cost = cost;
                best = p;
            }
        }
    }
    best
}

fn position_from_rank(rank: usize, parsize_c: [usize; 3]) -> [usize; 3] {
    let p2 = parsize_c[2];
    let p1 = parsize_c[1];
    [rank / (p1 * p2), (rank / p2) % p1, rank % p2]
}

/// Invert a 3x3 matrix
fn invert3(a: &Array2<f64>) -> Result<Array2<f64>> {
    let det = det3(a);
    if det.abs() < 1e-300 {
        return Err(GridError::BadGrid("singular cell matrix".to_string()));
    }
    let mut inv = Array2::zeros((3, 3));
    for i in 0..3 {
        for j in 0..3 {
            let i1 = (i + 1) % 3;
            let i2 = (i + 2) % 3;
            let j1 = (j + 1) % 3;
            let j2 = (j + 2) % 3;
            // Transposed cofactor
            inv[(j, i)] = (a[(i1, j1)] * a[(i2, j2)] - a[(i1, j2)] * a[(i2, j1)]) / det;
        }
    }
    Ok(inv)
}

/// Determinant of a 3x3 matrix
pub fn det3(a: &Array2<f64>) -> f64 {
    a[(0, 0)] * (a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)])
        - a[(0, 1)] * (a[(1, 0)] * a[(2, 2)] - a[(1, 2)] * a[(2, 0)])
        + a[(0, 2)] * (a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpi::serial_comm;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_decompose_domain_prefers_balanced_shapes() {
        assert_eq!(decompose_domain([16, 16, 16], 8), [2, 2, 2]);
        assert_eq!(decompose_domain([16, 16, 16], 1), [1, 1, 1]);
        // A flat grid should not be split along its short axis
        let p = decompose_domain([4, 64, 64], 4);
        assert_eq!(p[0], 1);
        assert_eq!(p[1] * p[2], 4);
    }

    #[test]
    fn test_rank_position_roundtrip() {
        let domain = Domain::new(
            array![[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]],
            [true; 3],
            serial_comm(),
            Some([1, 1, 1]),
            [8, 8, 8],
        )
        .unwrap();
        assert_eq!(domain.rank_from_position([0, 0, 0]), 0);
        assert_eq!(domain.position_from_rank(0), [0, 0, 0]);
    }

    #[test]
    fn test_parsize_must_match_comm() {
        let result = Domain::new(
            array![[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]],
            [true; 3],
            serial_comm(),
            Some([2, 1, 1]),
            [8, 8, 8],
        );
        assert!(matches!(result, Err(GridError::BadGrid(_))));
    }

    #[test]
    fn test_invert3() {
        let a = array![[2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [1.0, 0.0, 8.0]];
        let inv = invert3(&a).unwrap();
        let mut prod = Array2::<f64>::zeros((3, 3));
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    prod[(i, j)] += a[(i, k)] * inv[(k, j)];
                }
            }
        }
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }
}
