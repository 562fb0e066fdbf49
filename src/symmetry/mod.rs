/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Crystal symmetry
//!
//! Determines the point-group operations (plus fractional translations)
//! compatible with the lattice metric and the atomic arrangement, reduces
//! k-point meshes to the irreducible zone, and symmetrizes densities and
//! forces.
//!
//! The candidate rotations are the 3^9 integer matrices with entries in
//! {-1, 0, 1}: a closed, bounded set that contains every crystallographic
//! operation expressed in the lattice basis.

pub mod errors;
pub mod rotation;

pub use errors::{Result, SymmetryError};

use crate::grid::GridDescriptor;
use crate::utils::math::gcd;
use log::{debug, info};
use ndarray::{Array2, Array3};

/// Result of a k-point reduction
pub struct KPointReduction {
    /// Irreducible k-points
    pub ibz_kc: Vec<[f64; 3]>,
    /// Weight of each irreducible point (sums to one)
    pub weight_k: Vec<f64>,
    /// Symmetry operation mapping each BZ point to its irreducible image
    pub sym_k: Vec<usize>,
    /// Whether time reversal is applied on top of the operation
    pub time_reversal_k: Vec<bool>,
    /// Index of the irreducible point of each BZ point
    pub bz2ibz_k: Vec<usize>,
    /// BZ index of each irreducible point
    pub ibz2bz_k: Vec<usize>,
    /// Full symmetry-relation table bz2bz_ks (-1 where unrelated)
    pub bz2bz_ks: Array2<i64>,
}

/// Determination and application of crystal symmetry operations
pub struct Symmetry {
    /// Atom type id per atom (atoms mapping onto each other must share it)
    pub id_a: Vec<usize>,
    /// Cartesian lattice vectors as rows
    pub cell_cv: Array2<f64>,
    /// Periodic boundary conditions
    pub pbc_c: [bool; 3],
    /// Position tolerance
    pub tol: f64,
    /// Only symmorphic operations (no fractional translations)
    pub symmorphic: bool,
    /// Use point-group operations at all
    pub point_group: bool,
    /// Use time-reversal symmetry in k-point reduction
    pub time_reversal: bool,
    /// Rotations in the lattice basis
    pub op_scc: Vec<Array2<i64>>,
    /// Fractional translation per operation
    pub ft_sc: Vec<[f64; 3]>,
    /// Atom permutation per operation
    pub a_sa: Vec<Vec<usize>>,
    /// Whether inversion is among the operations
    pub has_inversion: bool,
    /// Least common grid divisors required by the fractional translations
    pub gcd_c: [usize; 3],
}

impl Symmetry {
    /// Create a symmetry object for a structure.
    ///
    /// Initially only the identity is present; call
    /// [`Symmetry::analyze`] to find the full set of operations.
    ///
    /// # Arguments
    ///
    /// * `id_a` - Numbered atomic types (atomic number or any id that
    ///   distinguishes atoms which must not map onto each other)
    /// * `cell_cv` - Cartesian lattice vectors as rows, Bohr
    /// * `pbc_c` - Periodic boundary conditions
    pub fn new(id_a: Vec<usize>, cell_cv: Array2<f64>, pbc_c: [bool; 3]) -> Symmetry {
        let identity = Array2::from_shape_fn((3, 3), |(i, j)| (i == j) as i64);
        Symmetry {
            a_sa: vec![(0..id_a.len()).collect()],
            id_a,
            cell_cv,
            pbc_c,
            tol: 1e-7,
            symmorphic: true,
            point_group: true,
            time_reversal: true,
            op_scc: vec![identity],
            ft_sc: vec![[0.0; 3]],
            has_inversion: false,
            gcd_c: [1, 1, 1],
        }
    }

    /// Enable fractional translations (non-symmorphic operations)
    pub fn with_fractional_translations(mut self) -> Symmetry {
        // Fractional translations require full periodicity
        if self.pbc_c.iter().all(|&p| p) {
            self.symmorphic = false;
        }
        self
    }

    /// Determine the list of symmetry operations: all lattice symmetries
    /// pruned by the atomic arrangement.
    pub fn analyze(&mut self, spos_ac: &[[f64; 3]]) {
        if !self.point_group {
            return;
        }
        self.find_lattice_symmetry();
        self.prune_symmetries_atoms(spos_ac);
        info!(
            "Symmetries present (total): {}{}",
            self.op_scc.len(),
            if self.symmorphic {
                String::new()
            } else {
                format!(
                    ", with fractional translations: {}",
                    self.ft_sc
                        .iter()
                        .filter(|t| t.iter().any(|&x| x != 0.0))
                        .count()
                )
            }
        );
    }

    /// All integer rotations that preserve the metric of the cell
    pub fn find_lattice_symmetry(&mut self) {
        self.op_scc.clear();

        // Metric tensor
        let mut metric = [[0.0; 3]; 3];
        for c1 in 0..3 {
            for c2 in 0..3 {
                for v in 0..3 {
                    metric[c1][c2] += self.cell_cv[(c1, v)] * self.cell_cv[(c2, v)];
                }
            }
        }

        // All 3^9 matrices with entries in {-1, 0, 1}
        for base3id in 0..19683u32 {
            let mut op_cc = Array2::zeros((3, 3));
            let mut m = base3id;
            for entry in (0..9).rev() {
                op_cc[(entry / 3, entry % 3)] = 1 - (m % 3) as i64;
                m /= 3;
            }

            // The operation must conserve the metric
            let mut deviation = 0.0;
            for c1 in 0..3 {
                for c2 in 0..3 {
                    let mut transformed = 0.0;
                    for k1 in 0..3 {
                        for k2 in 0..3 {
                            transformed +=
                                op_cc[(c1, k1)] as f64 * metric[k1][k2] * op_cc[(c2, k2)] as f64;
                        }
                    }
                    deviation += (metric[c1][c2] - transformed).abs();
                }
            }
            if deviation > self.tol {
                continue;
            }

            // Must not swap axes that are not both periodic
            let mut valid = true;
            for c1 in 0..3 {
                for c2 in 0..3 {
                    if c1 != c2
                        && op_cc[(c1, c2)] != 0
                        && !(self.pbc_c[c1] && self.pbc_c[c2])
                    {
                        valid = false;
                    }
                }
            }
            // Must not invert non-periodic axes
            for c in 0..3 {
                if !self.pbc_c[c] && op_cc[(c, c)] != 1 {
                    valid = false;
                }
            }
            if valid {
                self.op_scc.push(op_cc);
            }
        }
        self.ft_sc = vec![[0.0; 3]; self.op_scc.len()];
        debug!("Lattice symmetries: {}", self.op_scc.len());
    }

    /// Remove operations not satisfied by the atoms; find fractional
    /// translations where allowed
    pub fn prune_symmetries_atoms(&mut self, spos_ac: &[[f64; 3]]) {
        if spos_ac.is_empty() {
            self.a_sa = vec![Vec::new(); self.op_scc.len()];
            return;
        }

        // Atoms of the first species; translation candidates connect them
        let first_id = self.id_a[0];
        let a_j: Vec<usize> = (0..self.id_a.len())
            .filter(|&a| self.id_a[a] == first_id)
            .collect();

        let mut symmetries: Vec<(Array2<i64>, [f64; 3], Vec<usize>)> = Vec::new();
        let mut ftsymmetries: Vec<(Array2<i64>, [f64; 3], Vec<usize>)> = Vec::new();

        for op_cc in &self.op_scc {
            if let Some(a_a) = self.check_one_symmetry(spos_ac, op_cc, &[0.0; 3]) {
                symmetries.push((op_cc.clone(), [0.0; 3], a_a));
            } else if !self.symmorphic {
                // Candidate fractional translations from displacements of
                // rotated first-species atoms
                for &aj in &a_j {
                    let mut rotated = [0.0; 3];
                    for c in 0..3 {
                        for c2 in 0..3 {
                            rotated[c] += spos_ac[aj][c2] * op_cc[(c2, c)] as f64;
                        }
                    }
                    let mut ft = [0.0; 3];
                    let mut rational = true;
                    for c in 0..3 {
                        let mut t = rotated[c] - spos_ac[a_j[0]][c];
                        t -= t.round();
                        match to_fraction(t, self.tol) {
                            Some((nom, denom)) => {
                                ft[c] = nom as f64 / denom as f64;
                            }
                            None => {
                                rational = false;
                                break;
                            }
                        }
                    }
                    if !rational || ft.iter().all(|&t| t == 0.0) {
                        continue;
                    }
                    if let Some(a_a) = self.check_one_symmetry(spos_ac, op_cc, &ft) {
                        for c in 0..3 {
                            if let Some((_, denom)) = to_fraction(ft[c], self.tol) {
                                let g = gcd(self.gcd_c[c] as u64 * denom, denom);
                                self.gcd_c[c] = g as usize;
                            }
                        }
                        ftsymmetries.push((op_cc.clone(), ft, a_a));
                        break;
                    }
                }
            }
        }

        // Operations with fractional translations go last
        symmetries.extend(ftsymmetries);
        self.op_scc = symmetries.iter().map(|s| s.0.clone()).collect();
        self.ft_sc = symmetries.iter().map(|s| s.1).collect();
        self.a_sa = symmetries.into_iter().map(|s| s.2).collect();

        self.has_inversion = self.op_scc.iter().any(|op| {
            (0..3).all(|c1| (0..3).all(|c2| op[(c1, c2)] == -((c1 == c2) as i64)))
        });
    }

    /// Check whether the atoms satisfy one operation; returns the atom
    /// permutation if they do
    fn check_one_symmetry(
        &self,
        spos_ac: &[[f64; 3]],
        op_cc: &Array2<i64>,
        ft_c: &[f64; 3],
    ) -> Option<Vec<usize>> {
        let natoms = spos_ac.len();
        let mut a_a = vec![0; natoms];
        for a in 0..natoms {
            let mut rotated = [0.0; 3];
            for c in 0..3 {
                for c2 in 0..3 {
                    rotated[c] += spos_ac[a][c2] * op_cc[(c2, c)] as f64;
                }
            }
            let mut target = None;
            for b in 0..natoms {
                if self.id_a[b] != self.id_a[a] {
                    continue;
                }
                let mut matches = true;
                for c in 0..3 {
                    let mut diff = rotated[c] - spos_ac[b][c] - ft_c[c];
                    diff -= diff.round();
                    if diff.abs() > self.tol {
                        matches = false;
                        break;
                    }
                }
                if matches {
                    if target.is_some() {
                        return None;
                    }
                    target = Some(b);
                }
            }
            a_a[a] = target?;
        }
        Some(a_a)
    }

    /// Verify that positions still satisfy the stored operations
    pub fn check(&self, spos_ac: &[[f64; 3]]) -> Result<()> {
        for (s, op_cc) in self.op_scc.iter().enumerate() {
            if self
                .check_one_symmetry(spos_ac, op_cc, &self.ft_sc[s])
                .is_none()
            {
                return Err(SymmetryError::BrokenSymmetry);
            }
        }
        Ok(())
    }

    /// Reduce k-points to the irreducible part of the Brillouin zone.
    ///
    /// Equivalence classes are found by lexicographically sorting the
    /// original and transformed coordinates together and detecting
    /// adjacent duplicates, avoiding any pairwise comparison.
    pub fn reduce(&self, bzk_kc: &[[f64; 3]]) -> Result<KPointReduction> {
        let nbzkpts = bzk_kc.len();
        let nsym = self.op_scc.len();
        let time_reversal = self.time_reversal && !self.has_inversion;

        let bz2bz_ks = self.map_k_points_fast(bzk_kc, time_reversal)?;
        let nops = bz2bz_ks.ncols();

        // Group the points into orbits, walking backwards so the
        // highest-index representative wins
        let mut bz2bz_k = vec![-1i64; nbzkpts + 1];
        let mut ibz2bz_k: Vec<usize> = Vec::new();
        for k in (0..nbzkpts).rev() {
            if bz2bz_k[k] == -1 {
                for s in 0..nops {
                    let k1 = bz2bz_ks[(k, s)];
                    if k1 >= 0 {
                        bz2bz_k[k1 as usize] = k as i64;
                    }
                }
                ibz2bz_k.push(k);
            }
        }
        ibz2bz_k.reverse();

        let mut ibz_index = vec![0usize; nbzkpts];
        for (i, &k) in ibz2bz_k.iter().enumerate() {
            ibz_index[k] = i;
        }
        let mut bz2ibz_k = vec![0usize; nbzkpts];
        let mut weight_k = vec![0.0; ibz2bz_k.len()];
        for k in 0..nbzkpts {
            let rep = bz2bz_k[k] as usize;
            bz2ibz_k[k] = ibz_index[rep];
            weight_k[ibz_index[rep]] += 1.0 / nbzkpts as f64;
        }

        // Operation mapping the irreducible image onto each BZ point
        let mut sym_k = vec![0usize; nbzkpts];
        let mut time_reversal_k = vec![false; nbzkpts];
        for k in 0..nbzkpts {
            let rep = bz2bz_k[k] as usize;
            let mut found = false;
            for s in 0..nops {
                if bz2bz_ks[(rep, s)] == k as i64 {
                    time_reversal_k[k] = s >= nsym;
                    sym_k[k] = s % nsym;
                    found = true;
                    break;
                }
            }
            if !found {
                return Err(SymmetryError::KPointMapping(format!(
                    "no operation links k-point {} to its representative",
                    k
                )));
            }
        }

        let ibz_kc = ibz2bz_k.iter().map(|&k| bzk_kc[k]).collect();
        Ok(KPointReduction {
            ibz_kc,
            weight_k,
            sym_k,
            time_reversal_k,
            bz2ibz_k,
            ibz2bz_k,
            bz2bz_ks,
        })
    }

    /// Symmetry-relation table between k-points: bz2bz_ks[k1, s] = k2
    /// when operation s maps k1 onto k2 (operations >= nsym are the
    /// time-reversed set), -1 otherwise
    fn map_k_points_fast(
        &self,
        bzk_kc: &[[f64; 3]],
        time_reversal: bool,
    ) -> Result<Array2<i64>> {
        let nbzkpts = bzk_kc.len();
        let nsym = self.op_scc.len();
        let nops = if time_reversal { 2 * nsym } else { nsym };
        let mut bz2bz_ks = Array2::from_elem((nbzkpts, nops), -1i64);
        let digits = (-self.tol.log10()).round() as i32;
        let scale = 10f64.powi(digits);

        for s in 0..nops {
            let sign = if s >= nsym { -1.0 } else { 1.0 };
            let op_cc = &self.op_scc[s % nsym];

            // Original points followed by transformed points
            let mut k_kc: Vec<[f64; 3]> = Vec::with_capacity(2 * nbzkpts);
            for k_c in bzk_kc {
                let mut folded = [0.0; 3];
                for c in 0..3 {
                    folded[c] = k_c[c].rem_euclid(1.0).rem_euclid(1.0);
                }
                k_kc.push(folded);
            }
            for k_c in bzk_kc {
                let mut transformed = [0.0; 3];
                for c in 0..3 {
                    for c2 in 0..3 {
                        transformed[c] += sign * op_cc[(c, c2)] as f64 * k_c[c2];
                    }
                }
                for t in transformed.iter_mut() {
                    *t = t.rem_euclid(1.0).rem_euclid(1.0);
                }
                k_kc.push(transformed);
            }

            // Merge points that are closer than the tolerance, then snap
            // to a fixed number of digits so equality is exact
            aglomerate_points(&mut k_kc, self.tol);
            for k_c in k_kc.iter_mut() {
                for x in k_c.iter_mut() {
                    *x = ((*x * scale).round() / scale).rem_euclid(1.0);
                }
            }

            let mut order: Vec<usize> = (0..2 * nbzkpts).collect();
            order.sort_by(|&i, &j| {
                k_kc[i]
                    .partial_cmp(&k_kc[j])
                    .unwrap()
                    .then(i.cmp(&j))
            });

            for w in order.windows(2) {
                if k_kc[w[0]] == k_kc[w[1]] {
                    let (orig, image) = (w[0], w[1]);
                    if orig >= nbzkpts || image < nbzkpts {
                        return Err(SymmetryError::KPointMapping(
                            "duplicate k-points in the mesh".to_string(),
                        ));
                    }
                    bz2bz_ks[(image - nbzkpts, s)] = orig as i64;
                }
            }
        }
        Ok(bz2bz_ks)
    }

    /// Check that all operations are commensurate with a real-space grid
    pub fn check_grid(&self, n_c: [usize; 3]) -> Result<()> {
        for (op_cc, ft_c) in self.op_scc.iter().zip(&self.ft_sc) {
            for c1 in 0..3 {
                for c2 in 0..3 {
                    let moved = n_c[c2] as i64 * op_cc[(c1, c2)];
                    if moved.rem_euclid(n_c[c1] as i64) != 0 {
                        return Err(SymmetryError::IncommensurateGrid(format!(
                            "operation mixes axes with incompatible point counts {:?}",
                            n_c
                        )));
                    }
                }
                let t = ft_c[c1] * n_c[c1] as f64;
                if (t - t.round()).abs() > 1e-9 {
                    return Err(SymmetryError::IncommensurateGrid(format!(
                        "fractional translation {:?} not on the grid {:?}",
                        ft_c, n_c
                    )));
                }
            }
        }
        Ok(())
    }

    /// Symmetrize a distributed array on the grid
    pub fn symmetrize(&self, a: &mut Array3<f64>, gd: &GridDescriptor) -> Result<()> {
        gd.symmetrize(a, &self.op_scc, Some(&self.ft_sc))?;
        Ok(())
    }

    /// Average the atomic positions over the symmetry group
    pub fn symmetrize_positions(&self, spos_ac: &[[f64; 3]]) -> Vec<[f64; 3]> {
        let natoms = spos_ac.len();
        let mut spos_new = vec![[0.0; 3]; natoms];
        for (s, op_cc) in self.op_scc.iter().enumerate() {
            for a in 0..natoms {
                let mut rotated = [0.0; 3];
                for c in 0..3 {
                    for c2 in 0..3 {
                        rotated[c] += spos_ac[a][c2] * op_cc[(c2, c)] as f64;
                    }
                    rotated[c] -= self.ft_sc[s][c];
                    rotated[c] -= (rotated[c] + 1e-5).floor();
                }
                let target = self.a_sa[s][a];
                for c in 0..3 {
                    spos_new[target][c] += rotated[c];
                }
            }
        }
        for spos in spos_new.iter_mut() {
            for x in spos.iter_mut() {
                *x /= self.op_scc.len() as f64;
            }
        }
        spos_new
    }

    /// Symmetrize forces over the group
    pub fn symmetrize_forces(&self, f_av: &[[f64; 3]]) -> Vec<[f64; 3]> {
        let natoms = f_av.len();
        let mut out = vec![[0.0; 3]; natoms];
        for (map_a, op_cc) in self.a_sa.iter().zip(&self.op_scc) {
            let op_vv = self.cartesian_operation(op_cc);
            for (a1, f_v) in f_av.iter().enumerate() {
                let a2 = map_a[a1];
                for v1 in 0..3 {
                    for v2 in 0..3 {
                        out[a2][v1] += f_v[v2] * op_vv[(v2, v1)];
                    }
                }
            }
        }
        for f_v in out.iter_mut() {
            for x in f_v.iter_mut() {
                *x /= self.op_scc.len() as f64;
            }
        }
        out
    }

    /// Rotation in Cartesian coordinates: cell^-1 op cell
    pub fn cartesian_operation(&self, op_cc: &Array2<i64>) -> Array2<f64> {
        let inv = invert3(&self.cell_cv);
        let mut out = Array2::zeros((3, 3));
        for i in 0..3 {
            for j in 0..3 {
                for k1 in 0..3 {
                    for k2 in 0..3 {
                        out[(i, j)] +=
                            inv[(i, k1)] * op_cc[(k1, k2)] as f64 * self.cell_cv[(k2, j)];
                    }
                }
            }
        }
        out
    }
}

/// Merge coordinates that differ by less than tol, axis by axis
fn aglomerate_points(k_kc: &mut [[f64; 3]], tol: f64) {
    let nk = k_kc.len();
    for c in 0..3 {
        let mut order: Vec<usize> = (0..nk).collect();
        order.sort_by(|&i, &j| k_kc[i][c].partial_cmp(&k_kc[j][c]).unwrap());
        let mut start = 0;
        while start < nk {
            let mut end = start + 1;
            while end < nk && k_kc[order[end]][c] - k_kc[order[end - 1]][c] <= tol {
                end += 1;
            }
            let anchor = k_kc[order[start]][c];
            for &idx in &order[start..end] {
                k_kc[idx][c] = anchor;
            }
            start = end;
        }
    }
}

/// Express a coordinate as a small fraction; None if it is not one
fn to_fraction(x: f64, tol: f64) -> Option<(i64, u64)> {
    if x == 0.0 {
        return Some((0, 1));
    }
    let n: u64 = 2 * 3 * 4 * 5;
    let scaled = x * n as f64;
    if (scaled - scaled.round()).abs() > n as f64 * tol {
        return None;
    }
    let nom = scaled.round() as i64;
    let d = gcd(nom.unsigned_abs(), n);
    Some((nom / d as i64, n / d))
}

fn invert3(a: &Array2<f64>) -> Array2<f64> {
    let det = a[(0, 0)] * (a[(1, 1)] * a[(2, 2)] - a[(1, 2)] * a[(2, 1)])
        - a[(0, 1)] * (a[(1, 0)] * a[(2, 2)] - a[(1, 2)] * a[(2, 0)])
        + a[(0, 2)] * (a[(1, 0)] * a[(2, 1)] - a[(1, 1)] * a[(2, 0)]);
    let mut inv = Array2::zeros((3, 3));
    for i in 0..3 {
        for j in 0..3 {
            let i1 = (i + 1) % 3;
            let i2 = (i + 2) % 3;
            let j1 = (j + 1) % 3;
            let j2 = (j + 2) % 3;
            inv[(j, i)] = (a[(i1, j1)] * a[(i2, j2)] - a[(i1, j2)] * a[(i2, j1)]) / det;
        }
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn cubic_symmetry() -> Symmetry {
        let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut sym = Symmetry::new(vec![1], cell, [true; 3]);
        sym.analyze(&[[0.0, 0.0, 0.0]]);
        sym
    }

    #[test]
    fn test_cubic_cell_has_48_operations() {
        let sym = cubic_symmetry();
        assert_eq!(sym.op_scc.len(), 48);
        assert!(sym.has_inversion);
    }

    #[test]
    fn test_fcc_primitive_cell_has_48_operations() {
        // The holohedry is a property of the lattice, not of the cell
        // representation
        let cell = array![[0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0]];
        let mut sym = Symmetry::new(vec![1], cell, [true; 3]);
        sym.analyze(&[[0.0, 0.0, 0.0]]);
        assert_eq!(sym.op_scc.len(), 48);
    }

    #[test]
    fn test_two_different_atoms_reduce_symmetry() {
        let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut sym = Symmetry::new(vec![1, 2], cell, [true; 3]);
        sym.analyze(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]]);
        // CsCl structure keeps the full cubic group
        assert_eq!(sym.op_scc.len(), 48);
        // But moving the second atom off the body center breaks it
        let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut sym = Symmetry::new(vec![1, 2], cell, [true; 3]);
        sym.analyze(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.3]]);
        assert!(sym.op_scc.len() < 48);
    }

    #[test]
    fn test_nonperiodic_axis_restricts_operations() {
        let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut sym = Symmetry::new(vec![1], cell, [true, true, false]);
        sym.analyze(&[[0.0, 0.0, 0.0]]);
        // Only in-plane square-lattice operations survive: 8 of them
        assert_eq!(sym.op_scc.len(), 8);
    }

    #[test]
    fn test_check_detects_broken_symmetry() {
        let sym = cubic_symmetry();
        assert!(sym.check(&[[0.0, 0.0, 0.0]]).is_ok());
        assert!(matches!(
            sym.check(&[[0.1, 0.0, 0.0]]),
            Err(SymmetryError::BrokenSymmetry)
        ));
    }

    #[test]
    fn test_fractional_translation_found() {
        // Diamond-like pair of identical atoms: the operations that map
        // the two sublattices onto each other need translations
        let cell = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut sym =
            Symmetry::new(vec![1, 1], cell, [true; 3]).with_fractional_translations();
        sym.analyze(&[[0.0, 0.0, 0.0], [0.25, 0.25, 0.25]]);
        assert!(sym.ft_sc.iter().any(|t| t.iter().any(|&x| x != 0.0)));
    }

    #[test]
    fn test_kpoint_weights_sum_to_one() {
        let sym = cubic_symmetry();
        let n = 4;
        let mut bzk = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    bzk.push([
                        (2.0 * i as f64 + 1.0 - n as f64) / (2.0 * n as f64),
                        (2.0 * j as f64 + 1.0 - n as f64) / (2.0 * n as f64),
                        (2.0 * k as f64 + 1.0 - n as f64) / (2.0 * n as f64),
                    ]);
                }
            }
        }
        let reduction = sym.reduce(&bzk).unwrap();
        let total: f64 = reduction.weight_k.iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        // The off-center 4x4x4 mesh has |k_c| in {1/8, 3/8}; under the
        // full cubic group the orbits are the sorted multisets of those
        // magnitudes: 4 irreducible points
        assert_eq!(reduction.ibz_kc.len(), 4);
        // Each point must map onto its representative consistently
        for k in 0..bzk.len() {
            let rep = reduction.ibz2bz_k[reduction.bz2ibz_k[k]];
            let s = reduction.sym_k[k];
            let sign = if reduction.time_reversal_k[k] { -1.0 } else { 1.0 };
            let mut mapped = [0.0; 3];
            for c in 0..3 {
                for c2 in 0..3 {
                    mapped[c] += sign * sym.op_scc[s][(c, c2)] as f64 * bzk[rep][c2];
                }
            }
            for c in 0..3 {
                let mut diff = mapped[c] - bzk[k][c];
                diff -= diff.round();
                assert_relative_eq!(diff, 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_symmetrize_forces_cancels_at_origin() {
        let sym = cubic_symmetry();
        let forces = sym.symmetrize_forces(&[[0.1, -0.2, 0.3]]);
        for v in 0..3 {
            assert_relative_eq!(forces[0][v], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_check_grid() {
        let sym = cubic_symmetry();
        assert!(sym.check_grid([8, 8, 8]).is_ok());
        assert!(sym.check_grid([8, 8, 6]).is_err());
    }
}
