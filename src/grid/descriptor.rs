/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Descriptor for uniform 3D grids
//!
//! A [`GridDescriptor`] holds the discretization of a unit cell: how many
//! grid points each axis carries, which contiguous index block this rank
//! owns, and the grid spacings.  It provides array allocation, integration,
//! symmetrization and the collective operations that move data between the
//! distributed representation and a global array on rank 0.
//!
//! All collective methods (`collect`, `distribute`, `integrate` with
//! `global` set, `symmetrize`) must be entered by every rank of the
//! communicator in the same order.
//!
//! Lengths are in Bohr.  For a non-periodic axis the grid point at index 0
//! lies on the boundary, belongs to no rank and is implicitly zero, so the
//! actual number of stored points along that axis is one less than `n_c`.

use super::domain::{det3, Domain};
use super::errors::{GridError, Result};
use crate::mpi::Communicator;
use log::debug;
use ndarray::{s, Array2, Array3, Array4};
use std::sync::Arc;

/// One sub-block of the global array, owned by `rank`
///
/// Index ranges are in collected-array coordinates (the global array with
/// the non-periodic boundary point stripped).
#[derive(Debug, Clone)]
pub struct Block {
    pub rank: usize,
    pub beg_c: [usize; 3],
    pub end_c: [usize; 3],
}

/// The serialization order of `collect`/`distribute` as data
///
/// Blocks are listed in row-major process-grid order, which fixes the
/// deterministic layout of the global array independent of message
/// arrival order.
#[derive(Debug, Clone)]
pub struct TransposePlan {
    pub blocks: Vec<Block>,
}

/// Descriptor for a uniform 3D grid distributed over a process grid
#[derive(Debug)]
pub struct GridDescriptor {
    /// Domain decomposition (cell, pbc, communicator, process grid)
    pub domain: Domain,
    /// Global number of grid points along each axis
    pub n_c: [usize; 3],
    /// First grid-point index owned by this rank (inclusive)
    pub beg_c: [usize; 3],
    /// Last grid-point index owned by this rank (exclusive)
    pub end_c: [usize; 3],
    /// Local number of grid points
    pub n_local_c: [usize; 3],
    /// Partition tables: for each axis, the process-boundary indices
    pub n_cp: [Vec<usize>; 3],
    /// Grid spacing vectors h_cv = cell_cv / n_c
    pub h_cv: Array2<f64>,
    /// Cell volume
    pub volume: f64,
    /// Volume per grid point
    pub dv: f64,
    /// Whether the cell is diagonal
    pub orthogonal: bool,
    /// Serialization order of collect/distribute
    pub plan: TransposePlan,
}

impl GridDescriptor {
    /// Construct a grid descriptor.
    ///
    /// # Arguments
    ///
    /// * `n_c` - Number of grid points along each axis
    /// * `cell_cv` - 3x3 cell matrix (rows are lattice vectors, Bohr)
    /// * `pbc_c` - Periodic boundary flags
    /// * `comm` - Communicator for domain decomposition
    /// * `parsize_c` - Explicit process-grid shape, or None to choose one
    pub fn new(
        n_c: [usize; 3],
        cell_cv: Array2<f64>,
        pbc_c: [bool; 3],
        comm: Arc<dyn Communicator>,
        parsize_c: Option<[usize; 3]>,
    ) -> Result<Self> {
        if n_c.iter().any(|&n| n == 0) {
            return Err(GridError::BadGrid(format!(
                "Non-positive number of grid points {:?}",
                n_c
            )));
        }
        let domain = Domain::new(cell_cv, pbc_c, comm, parsize_c, n_c)?;

        let mut beg_c = [0; 3];
        let mut end_c = [0; 3];
        let mut n_cp: [Vec<usize>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for c in 0..3 {
            let parsize = domain.parsize_c[c];
            // Near-equal integer shares: n_p[i] = round(i N / P + 0.4999)
            let mut n_p: Vec<usize> = (0..=parsize)
                .map(|i| {
                    (i as f64 * n_c[c] as f64 / parsize as f64 + 0.4999).round() as usize
                })
                .collect();
            if !domain.pbc_c[c] {
                // Boundary point 0 belongs to no rank
                n_p[0] = 1;
            }
            if !n_p.windows(2).all(|w| w[1] > w[0]) {
                return Err(GridError::BadGrid(format!(
                    "Grid {}x{}x{} too small for {}x{}x{} cores!",
                    n_c[0],
                    n_c[1],
                    n_c[2],
                    domain.parsize_c[0],
                    domain.parsize_c[1],
                    domain.parsize_c[2]
                )));
            }
            beg_c[c] = n_p[domain.parpos_c[c]];
            end_c[c] = n_p[domain.parpos_c[c] + 1];
            n_cp[c] = n_p;
        }
        let n_local_c = [
            end_c[0] - beg_c[0],
            end_c[1] - beg_c[1],
            end_c[2] - beg_c[2],
        ];

        let mut h_cv = Array2::zeros((3, 3));
        for c in 0..3 {
            for v in 0..3 {
                h_cv[(c, v)] = domain.cell_cv[(c, v)] / n_c[c] as f64;
            }
        }
        let volume = det3(&domain.cell_cv).abs();
        let dv = volume / (n_c[0] * n_c[1] * n_c[2]) as f64;

        let mut orthogonal = true;
        for c in 0..3 {
            for v in 0..3 {
                if c != v && domain.cell_cv[(c, v)] != 0.0 {
                    orthogonal = false;
                }
            }
        }

        // Precompute the collect/distribute traversal in row-major
        // process-grid order.
        let mut blocks = Vec::with_capacity(domain.parsize_c.iter().product());
        let mut rank = 0;
        for p0 in 0..domain.parsize_c[0] {
            for p1 in 0..domain.parsize_c[1] {
                for p2 in 0..domain.parsize_c[2] {
                    let pos = [p0, p1, p2];
                    let mut bbeg = [0; 3];
                    let mut bend = [0; 3];
                    for c in 0..3 {
                        // Offset by n_cp[c][0] so indices address the
                        // collected array (boundary point stripped).
                        bbeg[c] = n_cp[c][pos[c]] - n_cp[c][0];
                        bend[c] = n_cp[c][pos[c] + 1] - n_cp[c][0];
                    }
                    blocks.push(Block {
                        rank,
                        beg_c: bbeg,
                        end_c: bend,
                    });
                    rank += 1;
                }
            }
        }

        let gd = GridDescriptor {
            domain,
            n_c,
            beg_c,
            end_c,
            n_local_c,
            n_cp,
            h_cv,
            volume,
            dv,
            orthogonal,
            plan: TransposePlan { blocks },
        };

        // Central finite differences degrade badly on anisotropic grids.
        let h_c = gd.grid_spacings();
        let hmax = h_c.iter().cloned().fold(f64::MIN, f64::max);
        let hmin = h_c.iter().cloned().fold(f64::MAX, f64::min);
        if hmax / hmin > 1.3 {
            return Err(GridError::AnisotropicGrid(h_c));
        }

        debug!(
            "GridDescriptor: {:?} points, parsize {:?}, h = {:?} Bohr",
            gd.n_c, gd.domain.parsize_c, h_c
        );
        Ok(gd)
    }

    /// Communicator shared by all domains
    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.domain.comm
    }

    fn rank(&self) -> usize {
        self.domain.comm.rank()
    }

    /// Effective grid spacing along each axis (distance between lattice
    /// planes divided by the point count)
    pub fn grid_spacings(&self) -> [f64; 3] {
        let mut h_c = [0.0; 3];
        for c in 0..3 {
            let mut s = 0.0;
            for v in 0..3 {
                s += self.domain.icell_cv[(v, c)] * self.domain.icell_cv[(v, c)];
            }
            h_c[c] = 1.0 / s.sqrt() / self.n_c[c] as f64;
        }
        h_c
    }

    /// Shape of a global array: padded (`n_c`) or reduced
    /// (`n_c - 1 + pbc`, the collected representation)
    pub fn global_shape(&self, pad: bool) -> [usize; 3] {
        let mut shape = self.n_c;
        if !pad {
            for c in 0..3 {
                if !self.domain.pbc_c[c] {
                    shape[c] -= 1;
                }
            }
        }
        shape
    }

    /// New zeroed array over this rank's sub-domain
    pub fn zeros(&self) -> Array3<f64> {
        Array3::zeros(self.n_local_c)
    }

    /// New zeroed global array (reduced shape unless `pad`)
    pub fn zeros_global(&self, pad: bool) -> Array3<f64> {
        Array3::zeros(self.global_shape(pad))
    }

    /// New zeroed band-indexed array, shape (n, local grid shape).
    ///
    /// Safe Rust has no uninitialized allocation, so this also serves the
    /// role an `empty` allocator plays elsewhere.
    pub fn zeros_bands(&self, n: usize) -> Array4<f64> {
        Array4::zeros((
            n,
            self.n_local_c[0],
            self.n_local_c[1],
            self.n_local_c[2],
        ))
    }

    /// Coordinates along one axis, for plotting and dipole moments
    pub fn coords(&self, c: usize, pad: bool) -> Vec<f64> {
        let mut l = 0.0;
        for v in 0..3 {
            l += self.domain.cell_cv[(c, v)] * self.domain.cell_cv[(c, v)];
        }
        let l = l.sqrt();
        let n = self.n_c[c];
        let h = l / n as f64;
        let p = self.domain.pbc_c[c] || pad;
        let start = if p { 0.0 } else { h };
        let count = n - 1 + p as usize;
        (0..count).map(|i| start + i as f64 * h).collect()
    }

    /// Check that an array matches this rank's sub-domain shape
    fn check_local(&self, a: &Array3<f64>) -> Result<()> {
        let dim = a.dim();
        let got = [dim.0, dim.1, dim.2];
        if got != self.n_local_c {
            return Err(GridError::ShapeMismatch {
                expected: self.n_local_c,
                got,
            });
        }
        Ok(())
    }

    /// Integrate a function over the domain.
    ///
    /// # Arguments
    ///
    /// * `a` - Values on this rank's sub-domain
    /// * `global` - Reduce the partial sums over all domains.  Pass false
    ///   to get only the local contribution (used to delay the
    ///   synchronization point when several integrals are accumulated).
    pub fn integrate(&self, a: &Array3<f64>, global: bool) -> Result<f64> {
        self.check_local(a)?;
        let mut result = a.sum() * self.dv;
        if global {
            result = self.domain.comm.sum_scalar(result)?;
        }
        Ok(result)
    }

    /// Pairwise inner products of two sets of functions.
    ///
    /// Returns the matrix result[x, y] = dv * sum_g a_ng[x] b_ng[y].  With
    /// `hermitian` only the upper triangle is computed and mirrored,
    /// halving the work; use it when the result is known to be symmetric
    /// (in particular when `a_ng` and `b_ng` are the same set).
    pub fn integrate_pairs(
        &self,
        a_ng: &[Array3<f64>],
        b_ng: &[Array3<f64>],
        hermitian: bool,
        global: bool,
    ) -> Result<Array2<f64>> {
        for a in a_ng.iter().chain(b_ng.iter()) {
            self.check_local(a)?;
        }
        let na = a_ng.len();
        let nb = b_ng.len();
        let mut result = Array2::zeros((na, nb));
        if hermitian {
            if na != nb {
                return Err(GridError::BadGrid(
                    "hermitian product needs equally many functions".to_string(),
                ));
            }
            for x in 0..na {
                for y in x..nb {
                    let mut s = 0.0;
                    for (av, bv) in a_ng[x].iter().zip(b_ng[y].iter()) {
                        s += av * bv;
                    }
                    result[(x, y)] = s * self.dv;
                    result[(y, x)] = result[(x, y)];
                }
            }
        } else {
            for x in 0..na {
                for y in 0..nb {
                    let mut s = 0.0;
                    for (av, bv) in a_ng[x].iter().zip(b_ng[y].iter()) {
                        s += av * bv;
                    }
                    result[(x, y)] = s * self.dv;
                }
            }
        }
        if global {
            let mut flat: Vec<f64> = result.iter().cloned().collect();
            self.domain.comm.sum(&mut flat)?;
            for (r, v) in result.iter_mut().zip(flat) {
                *r = v;
            }
        }
        Ok(result)
    }

    /// Collect the distributed array into a global array.
    ///
    /// Every rank must call this.  Rank 0 receives the sub-blocks in the
    /// fixed order of [`TransposePlan`] and returns the assembled array;
    /// other ranks return None unless `broadcast` is set, in which case
    /// everyone gets a copy.  Non-master ranks use synchronous sends so
    /// that no more than one message per rank is in flight before rank 0
    /// posts the matching receive.
    pub fn collect(&self, a: &Array3<f64>, broadcast: bool) -> Result<Option<Array3<f64>>> {
        self.check_local(a)?;
        if self.domain.comm.size() == 1 {
            return Ok(Some(a.clone()));
        }

        if self.rank() != 0 {
            let data: Vec<f64> = a.iter().cloned().collect();
            self.domain.comm.ssend(&data, 0, 301)?;
            if broadcast {
                let shape = self.global_shape(false);
                let mut buf = vec![0.0; shape.iter().product()];
                self.domain.comm.broadcast(&mut buf, 0)?;
                let full = Array3::from_shape_vec(shape, buf)
                    .expect("broadcast buffer matches global shape");
                return Ok(Some(full));
            }
            return Ok(None);
        }

        let mut full = self.zeros_global(false);
        for block in &self.plan.blocks {
            let shape = [
                block.end_c[0] - block.beg_c[0],
                block.end_c[1] - block.beg_c[1],
                block.end_c[2] - block.beg_c[2],
            ];
            let sub = if block.rank == 0 {
                a.clone()
            } else {
                let mut buf = vec![0.0; shape.iter().product()];
                self.domain.comm.receive(&mut buf, block.rank, 301)?;
                Array3::from_shape_vec(shape, buf).expect("received block matches plan shape")
            };
            full.slice_mut(s![
                block.beg_c[0]..block.end_c[0],
                block.beg_c[1]..block.end_c[1],
                block.beg_c[2]..block.end_c[2]
            ])
            .assign(&sub);
        }
        if broadcast {
            let mut buf: Vec<f64> = full.iter().cloned().collect();
            self.domain.comm.broadcast(&mut buf, 0)?;
        }
        Ok(Some(full))
    }

    /// Distribute a global array to the sub-domains (inverse of
    /// [`GridDescriptor::collect`]).
    ///
    /// Only rank 0 reads `full`; the other ranks pass None.  Every rank
    /// must call this collectively.  Rank 0 assigns its own slice before
    /// issuing any sends, and all outstanding sends are waited on before
    /// the call returns.
    pub fn distribute(&self, full: Option<&Array3<f64>>) -> Result<Array3<f64>> {
        if self.domain.comm.size() == 1 {
            let full = full.ok_or_else(|| {
                GridError::BadGrid("distribute needs the global array on rank 0".to_string())
            })?;
            return Ok(full.clone());
        }

        if self.rank() != 0 {
            let mut buf = vec![0.0; self.n_local_c.iter().product()];
            self.domain.comm.receive(&mut buf, 0, 42)?;
            let out = Array3::from_shape_vec(self.n_local_c, buf)
                .expect("received slice matches local shape");
            return Ok(out);
        }

        let full = full.ok_or_else(|| {
            GridError::BadGrid("distribute needs the global array on rank 0".to_string())
        })?;
        let gshape = self.global_shape(false);
        let fdim = full.dim();
        if [fdim.0, fdim.1, fdim.2] != gshape {
            return Err(GridError::ShapeMismatch {
                expected: gshape,
                got: [fdim.0, fdim.1, fdim.2],
            });
        }

        let mut out = self.zeros();
        let mut requests = Vec::new();
        for block in &self.plan.blocks {
            let sub = full.slice(s![
                block.beg_c[0]..block.end_c[0],
                block.beg_c[1]..block.end_c[1],
                block.beg_c[2]..block.end_c[2]
            ]);
            if block.rank == 0 {
                out.assign(&sub);
            } else {
                let data: Vec<f64> = sub.iter().cloned().collect();
                requests.push(self.domain.comm.isend(&data, block.rank, 42)?);
            }
        }
        for request in requests {
            self.domain.comm.wait(request)?;
        }
        Ok(out)
    }

    /// Pad a reduced global array with zeros along non-periodic directions
    pub fn zero_pad(&self, a: &Array3<f64>) -> Array3<f64> {
        if self.domain.pbc_c.iter().all(|&p| p) {
            return a.clone();
        }
        let mut b = self.zeros_global(true);
        let off = [
            !self.domain.pbc_c[0] as usize,
            !self.domain.pbc_c[1] as usize,
            !self.domain.pbc_c[2] as usize,
        ];
        let dim = a.dim();
        b.slice_mut(s![
            off[0]..off[0] + dim.0,
            off[1]..off[1] + dim.1,
            off[2]..off[2] + dim.2
        ])
        .assign(a);
        b
    }

    /// New descriptor with 2x2x2 fewer grid points
    pub fn coarsen(&self) -> Result<GridDescriptor> {
        if self.n_c.iter().any(|&n| n % 2 == 1) {
            return Err(GridError::BadGrid(format!(
                "Grid {:?} not divisible by 2!",
                self.n_c
            )));
        }
        self.new_descriptor([self.n_c[0] / 2, self.n_c[1] / 2, self.n_c[2] / 2])
    }

    /// New descriptor with 2x2x2 more grid points
    pub fn refine(&self) -> Result<GridDescriptor> {
        self.new_descriptor([self.n_c[0] * 2, self.n_c[1] * 2, self.n_c[2] * 2])
    }

    fn new_descriptor(&self, n_c: [usize; 3]) -> Result<GridDescriptor> {
        GridDescriptor::new(
            n_c,
            self.domain.cell_cv.clone(),
            self.domain.pbc_c,
            self.domain.comm.clone(),
            Some(self.domain.parsize_c),
        )
    }

    /// Find the boxes of this rank's sub-domain that intersect a sphere.
    ///
    /// # Arguments
    ///
    /// * `spos_c` - Sphere center in scaled coordinates
    /// * `rcut` - Sphere radius in Bohr
    /// * `cut` - Clamp the sphere at non-periodic boundaries instead of
    ///   failing when it crosses them
    ///
    /// # Returns
    ///
    /// Triples (begin, end, displacement): the grid-index box and the
    /// periodic-image displacement (in scaled coordinates) that maps the
    /// box back onto the sphere.  Spheres wrapping a periodic boundary
    /// yield several boxes.
    pub fn get_boxes(
        &self,
        spos_c: [f64; 3],
        rcut: f64,
        cut: bool,
    ) -> Result<Vec<([usize; 3], [usize; 3], [f64; 3])>> {
        let n_c = self.n_c;
        let mut beg_c = [0i64; 3];
        let mut end_c = [0i64; 3];
        for c in 0..3 {
            let mut s = 0.0;
            for v in 0..3 {
                s += self.domain.icell_cv[(v, c)] * self.domain.icell_cv[(v, c)];
            }
            let ncut = rcut * s.sqrt() * n_c[c] as f64;
            let npos = spos_c[c] * n_c[c] as f64;
            beg_c[c] = (npos - ncut).ceil() as i64;
            end_c[c] = (npos + ncut).ceil() as i64;
        }

        for c in 0..3 {
            if !self.domain.pbc_c[c] {
                if cut {
                    beg_c[c] = beg_c[c].max(0);
                    end_c[c] = end_c[c].min(n_c[c] as i64);
                } else if beg_c[c] < 0 || end_c[c] > n_c[c] as i64 {
                    return Err(GridError::GridBounds(format!(
                        "Box at {:.3} {:.3} {:.3} crosses boundary.  \
                         Beg. of box {:?}, end of box {:?}, max box size {:?}",
                        spos_c[0], spos_c[1], spos_c[2], beg_c, end_c, self.n_c
                    )));
                }
            }
        }

        // Split each axis range into intervals that wrap at most once
        // around the periodic boundary and intersect this rank's slab.
        let mut range_c: [Vec<(i64, i64)>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for c in 0..3 {
            let n = n_c[c] as i64;
            let mut b = beg_c[c];
            let mut e = b;
            while e < end_c[c] {
                let b0 = b.rem_euclid(n);
                e = end_c[c].min(b + n - b0);
                let b1 = if b0 < self.beg_c[c] as i64 {
                    b + self.beg_c[c] as i64 - b0
                } else {
                    b
                };
                let e0 = b0 - b + e;
                let e1 = if e0 > self.end_c[c] as i64 {
                    e - (e0 - self.end_c[c] as i64)
                } else {
                    e
                };
                if e1 > b1 {
                    range_c[c].push((b1, e1));
                }
                b = e;
            }
        }

        let mut boxes = Vec::new();
        for &(b0, e0) in &range_c[0] {
            for &(b1, e1) in &range_c[1] {
                for &(b2, e2) in &range_c[2] {
                    let b = [b0, b1, b2];
                    let e = [e0, e1, e2];
                    let mut bbeg = [0usize; 3];
                    let mut bend = [0usize; 3];
                    let mut disp = [0.0; 3];
                    let mut nonempty = true;
                    for c in 0..3 {
                        let n = n_c[c] as i64;
                        let wrapped = b[c].rem_euclid(n);
                        let end = wrapped + e[c] - b[c];
                        disp[c] = (b[c] - wrapped) as f64 / n as f64;
                        let begc = (wrapped.max(self.beg_c[c] as i64)) as usize;
                        let endc = (end.min(self.end_c[c] as i64)) as usize;
                        if endc <= begc {
                            nonempty = false;
                            break;
                        }
                        bbeg[c] = begc;
                        bend[c] = endc;
                    }
                    if nonempty {
                        boxes.push((bbeg, bend, disp));
                    }
                }
            }
        }
        Ok(boxes)
    }

    /// Index of the grid point nearest to a scaled position, relative to
    /// this rank's slab.
    ///
    /// The nearest point can lie on another rank, in which case the result
    /// is outside [0, n_local_c); set `force_to_this_domain` to clamp it.
    pub fn get_nearest_grid_point(
        &self,
        spos_c: [f64; 3],
        force_to_this_domain: bool,
    ) -> [i64; 3] {
        let mut g_c = [0i64; 3];
        for c in 0..3 {
            let mut g = (self.n_c[c] as f64 * spos_c[c]).round() as i64;
            if force_to_this_domain {
                g = g.max(self.beg_c[c] as i64);
                g = g.min(self.end_c[c] as i64 - 1);
            }
            g_c[c] = g - self.beg_c[c] as i64;
        }
        g_c
    }

    /// Cartesian coordinates of this rank's grid points, shape (3, n0, n1, n2)
    pub fn grid_point_coordinates(&self) -> Array4<f64> {
        let n = self.n_local_c;
        let mut r_vg = Array4::zeros((3, n[0], n[1], n[2]));
        for g0 in 0..n[0] {
            for g1 in 0..n[1] {
                for g2 in 0..n[2] {
                    let g_c = [
                        (g0 + self.beg_c[0]) as f64,
                        (g1 + self.beg_c[1]) as f64,
                        (g2 + self.beg_c[2]) as f64,
                    ];
                    for v in 0..3 {
                        let mut x = 0.0;
                        for c in 0..3 {
                            x += g_c[c] * self.h_cv[(c, v)];
                        }
                        r_vg[(v, g0, g1, g2)] = x;
                    }
                }
            }
        }
        r_vg
    }

    /// Dipole moment of a density, reduced over all domains
    pub fn calculate_dipole_moment(&self, rho_g: &Array3<f64>) -> Result<[f64; 3]> {
        self.check_local(rho_g)?;
        let n = self.n_local_c;
        let mut rhog_c = [0.0; 3];
        for g0 in 0..n[0] {
            for g1 in 0..n[1] {
                for g2 in 0..n[2] {
                    let rho = rho_g[(g0, g1, g2)];
                    rhog_c[0] += (g0 + self.beg_c[0]) as f64 * rho;
                    rhog_c[1] += (g1 + self.beg_c[1]) as f64 * rho;
                    rhog_c[2] += (g2 + self.beg_c[2]) as f64 * rho;
                }
            }
        }
        let mut d_c = [0.0; 3];
        for v in 0..3 {
            for c in 0..3 {
                d_c[v] -= rhog_c[c] * self.h_cv[(c, v)] * self.dv;
            }
        }
        self.domain.comm.sum(&mut d_c)?;
        Ok(d_c)
    }

    /// Symmetrize a distributed array under a set of point-group
    /// operations with optional fractional translations.
    ///
    /// The array is collected to rank 0, each operation is applied as a
    /// grid-index permutation, the average over all operations is
    /// redistributed.  All grid axes must be periodic and the operations
    /// must be commensurate with the grid (each fractional translation
    /// times `n_c` integral).
    pub fn symmetrize(
        &self,
        a: &mut Array3<f64>,
        op_scc: &[Array2<i64>],
        ft_sc: Option<&[[f64; 3]]>,
    ) -> Result<()> {
        if op_scc.len() == 1 {
            return Ok(());
        }
        if !self.domain.pbc_c.iter().all(|&p| p) {
            return Err(GridError::BadGrid(
                "symmetrization needs periodic boundary conditions".to_string(),
            ));
        }
        let ft_sc = match ft_sc {
            Some(ft) if ft.iter().any(|t| t.iter().any(|&x| x != 0.0)) => Some(ft),
            _ => None,
        };

        let collected = self.collect(a, false)?;
        let full = if self.rank() == 0 {
            let a_g = collected.expect("rank 0 always owns the collected array");
            let n = self.n_c;
            let mut b_g = Array3::zeros(a_g.dim());
            for (s, op_cc) in op_scc.iter().enumerate() {
                // Integral translation in grid points
                let mut t_c = [0i64; 3];
                if let Some(ft) = ft_sc {
                    for c in 0..3 {
                        let t = ft[s][c] * n[c] as f64;
                        if (t - t.round()).abs() > 1e-9 {
                            return Err(GridError::BadGrid(format!(
                                "Fractional translation {:?} not commensurate with grid {:?}",
                                ft[s], n
                            )));
                        }
                        t_c[c] = t.round() as i64;
                    }
                }
                for g0 in 0..n[0] {
                    for g1 in 0..n[1] {
                        for g2 in 0..n[2] {
                            let g_c = [g0 as i64, g1 as i64, g2 as i64];
                            let mut t = [0usize; 3];
                            for c in 0..3 {
                                let mut x = -t_c[c];
                                for cp in 0..3 {
                                    x += g_c[cp] * op_cc[(cp, c)];
                                }
                                t[c] = x.rem_euclid(n[c] as i64) as usize;
                            }
                            b_g[(t[0], t[1], t[2])] += a_g[(g0, g1, g2)];
                        }
                    }
                }
            }
            b_g /= op_scc.len() as f64;
            Some(b_g)
        } else {
            None
        };
        *a = self.distribute(full.as_ref())?;
        Ok(())
    }
}

/// Equality compares only the locally-known fields (shape, spacing and
/// this rank's index range); the partition tables of remote ranks are not
/// verified, so on exotic communicator layouts two descriptors can
/// compare equal on one rank and unequal on another.  An `==` operator
/// must not invoke a collective, so this is left as is and pinned by a
/// test.
impl PartialEq for GridDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.dv == other.dv
            && self.h_cv == other.h_cv
            && self.n_c == other.n_c
            && self.n_local_c == other.n_local_c
            && self.beg_c == other.beg_c
            && self.end_c == other.end_c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpi::serial_comm;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn cube(n: usize, l: f64) -> GridDescriptor {
        GridDescriptor::new(
            [n, n, n],
            array![[l, 0.0, 0.0], [0.0, l, 0.0], [0.0, 0.0, l]],
            [true; 3],
            serial_comm(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_basic_attributes() {
        let gd = cube(8, 8.0);
        assert_eq!(gd.n_local_c, [8, 8, 8]);
        assert_eq!(gd.beg_c, [0, 0, 0]);
        assert_relative_eq!(gd.dv, 1.0, epsilon = 1e-12);
        assert_relative_eq!(gd.volume, 512.0, epsilon = 1e-12);
        assert!(gd.orthogonal);
    }

    #[test]
    fn test_nonperiodic_axis_starts_at_one() {
        let gd = GridDescriptor::new(
            [8, 8, 8],
            array![[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]],
            [false, true, true],
            serial_comm(),
            None,
        )
        .unwrap();
        assert_eq!(gd.beg_c, [1, 0, 0]);
        assert_eq!(gd.n_local_c, [7, 8, 8]);
        assert_eq!(gd.global_shape(false), [7, 8, 8]);
        assert_eq!(gd.global_shape(true), [8, 8, 8]);
    }

    #[test]
    fn test_anisotropic_grid_rejected() {
        let result = GridDescriptor::new(
            [8, 8, 8],
            array![[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 16.0]],
            [true; 3],
            serial_comm(),
            None,
        );
        assert!(matches!(result, Err(GridError::AnisotropicGrid(_))));
    }

    #[test]
    fn test_integrate_unit_density() {
        let gd = cube(8, 8.0);
        let mut a = gd.zeros();
        a.fill(1.0);
        let result = gd.integrate(&a, true).unwrap();
        assert_relative_eq!(result, 512.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_linearity() {
        let gd = cube(4, 4.0);
        let mut a = gd.zeros();
        let mut b = gd.zeros();
        for (i, v) in a.iter_mut().enumerate() {
            *v = i as f64;
        }
        for (i, v) in b.iter_mut().enumerate() {
            *v = (i % 7) as f64 - 3.0;
        }
        let sum = gd.integrate(&(&a + &b), true).unwrap();
        let parts =
            gd.integrate(&a, true).unwrap() + gd.integrate(&b, true).unwrap();
        assert_relative_eq!(sum, parts, epsilon = 1e-10);
    }

    #[test]
    fn test_coarsen_refine() {
        let gd = cube(8, 8.0);
        let coarse = gd.coarsen().unwrap();
        assert_eq!(coarse.n_c, [4, 4, 4]);
        let fine = gd.refine().unwrap();
        assert_eq!(fine.n_c, [16, 16, 16]);
        assert!(cube(7, 7.0).coarsen().is_err());
    }

    #[test]
    fn test_collect_distribute_serial_roundtrip() {
        let gd = cube(4, 4.0);
        let mut a = gd.zeros();
        for (i, v) in a.iter_mut().enumerate() {
            *v = i as f64;
        }
        let full = gd.collect(&a, false).unwrap().unwrap();
        let back = gd.distribute(Some(&full)).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn test_get_boxes_centered_sphere() {
        let gd = cube(8, 8.0);
        let boxes = gd.get_boxes([0.5, 0.5, 0.5], 1.0, true).unwrap();
        assert_eq!(boxes.len(), 1);
        let (beg, end, disp) = boxes[0];
        assert_eq!(disp, [0.0, 0.0, 0.0]);
        for c in 0..3 {
            assert!(beg[c] >= 3 && end[c] <= 6 && beg[c] < end[c]);
        }
    }

    #[test]
    fn test_get_boxes_wrapping_sphere() {
        let gd = cube(8, 8.0);
        // Sphere at the origin wraps around all three periodic boundaries
        let boxes = gd.get_boxes([0.0, 0.0, 0.0], 1.5, true).unwrap();
        assert_eq!(boxes.len(), 8);
        // Displacements must map each box back onto the sphere
        for (_, _, disp) in &boxes {
            for d in disp {
                assert!(*d == 0.0 || *d == -1.0);
            }
        }
    }

    #[test]
    fn test_nonperiodic_box_crossing_is_error() {
        let gd = GridDescriptor::new(
            [8, 8, 8],
            array![[8.0, 0.0, 0.0], [0.0, 8.0, 0.0], [0.0, 0.0, 8.0]],
            [false; 3],
            serial_comm(),
            None,
        )
        .unwrap();
        let result = gd.get_boxes([0.0, 0.5, 0.5], 1.0, false);
        assert!(matches!(result, Err(GridError::GridBounds(_))));
    }

    #[test]
    fn test_symmetrize_inversion() {
        let gd = cube(4, 4.0);
        let mut a = gd.zeros();
        for (i, v) in a.iter_mut().enumerate() {
            *v = i as f64;
        }
        let identity = array![[1i64, 0, 0], [0, 1, 0], [0, 0, 1]];
        let inversion = array![[-1i64, 0, 0], [0, -1, 0], [0, 0, -1]];
        let total_before = a.sum();
        gd.symmetrize(&mut a, &[identity.clone(), inversion.clone()], None)
            .unwrap();
        // Averaging over a group preserves the total and makes the array
        // invariant under every group element.
        assert_relative_eq!(a.sum(), total_before, epsilon = 1e-9);
        let b = a.clone();
        gd.symmetrize(&mut a, &[identity, inversion], None).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dipole_moment_point_charge() {
        let gd = cube(8, 8.0);
        let mut rho = gd.zeros();
        rho[(2, 4, 6)] = 1.0;
        let d = gd.calculate_dipole_moment(&rho).unwrap();
        assert_relative_eq!(d[0], -2.0, epsilon = 1e-12);
        assert_relative_eq!(d[1], -4.0, epsilon = 1e-12);
        assert_relative_eq!(d[2], -6.0, epsilon = 1e-12);
    }
}
