/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Runtime setup: the per-atom correction tensors
//!
//! A [`Setup`] is built once from a [`SetupData`] and is immutable
//! afterwards; every atom of the same type shares it read-only.  It packs
//! the projector channels into a single index space ordered by (channel,
//! magnetic quantum number) and assembles the tensors the
//! self-consistency loop reads every iteration: compensation-charge
//! expansion Delta_pL, overlap corrections dO_ii/dC_ii, and the
//! electrostatic/kinetic corrections M, M_p, M_pp, K_p.

use super::data::SetupData;
use super::errors::Result;
use crate::gaunt::gaunt;
use crate::radial::{RadialGrid, Spline};
use crate::utils::linear_algebra::{invert, ndarray_to_faer};
use crate::utils::unpack;
use ndarray::{Array1, Array2, Array3};
use once_cell::sync::OnceCell;
use std::f64::consts::PI;
use std::sync::Arc;

/// Immutable per-element setup
pub struct Setup {
    /// The raw dataset
    pub data: Arc<SetupData>,
    /// Chemical symbol
    pub symbol: String,
    /// Atomic number
    pub z: usize,
    /// Core electrons
    pub nc_electrons: f64,
    /// Valence electrons
    pub nv_electrons: f64,

    /// Angular momenta of the projector channels
    pub l_j: Vec<usize>,
    /// Number of projector channels
    pub nj: usize,
    /// Number of projector functions counting m degeneracy
    pub ni: usize,
    /// Number of atomic orbitals (partial-wave basis functions)
    pub nao: usize,
    /// Compensation-charge expansion cutoff
    pub lmax: usize,
    /// Number of expansion functions (lmax+1)²
    pub lmax_sq: usize,
    /// Angular cutoff of the density expansion
    pub lcut: usize,

    /// Full radial grid
    pub rgd: RadialGrid,
    /// Truncated grid the corrections are evaluated on
    pub rgd2: RadialGrid,
    /// Truncation index (2 rcutmax)
    pub gcut2: usize,

    /// Projector overlaps B_ii = <pt_i | pt_i'>
    pub b_ii: Array2<f64>,
    /// Overlap correction dO_ii
    pub do_ii: Array2<f64>,
    /// Inverse-overlap coefficients dC_ii = -dO (1 + B dO)^-1
    pub dc_ii: Array2<f64>,

    /// Compensation-charge expansion, packed pair index x L
    pub delta_pl: Array2<f64>,
    /// Unpacked expansion (ni, ni, Lmax)
    pub delta_iil: Array3<f64>,
    /// Monopole constant
    pub delta0: f64,
    /// Augmentation-sphere electron count per packed pair
    pub n0_p: Array1<f64>,

    /// Constant Coulomb correction
    pub m: f64,
    /// Linear Coulomb correction
    pub m_p: Array1<f64>,
    /// Quadratic Coulomb correction
    pub m_pp: Array2<f64>,
    /// Core kinetic-energy constant
    pub kc: f64,
    /// Linear kinetic correction
    pub k_p: Array1<f64>,
    /// Constant zero-potential correction
    pub mb: f64,
    /// Linear zero-potential correction
    pub mb_p: Array1<f64>,
    /// Constant average-electrostatic-potential correction
    pub deh0: f64,
    /// Linear average-electrostatic-potential correction
    pub deh_p: Array1<f64>,
    /// Reference atomic energy
    pub e: f64,
    /// Core exact-exchange energy
    pub exx_c: f64,
    /// Packed core-valence exchange matrix
    pub x_p: Array1<f64>,

    /// Analytic integral of the pseudo core density
    pub nct_integral: f64,
    /// Core-density cutoff radius
    pub rcore: f64,

    /// Projector splines
    pub pt_j: Vec<Spline>,
    /// Partial-wave basis splines (bound states, smoothly truncated)
    pub phit_j: Vec<Spline>,
    /// Zero-potential spline
    pub vbar: Spline,
    /// Pseudo-core-density spline
    pub nct: Spline,
    /// Pseudo-core-kinetic-density spline
    pub tauct: Spline,
    /// Compensation-charge shape-function splines
    pub ghat_l: Vec<Spline>,

    // Retained for on-demand screened-exchange assembly
    t_lqp: Array3<f64>,
    n_qg: Array2<f64>,
    nt_qg: Array2<f64>,
    nc2_g: Array1<f64>,
    nct2_g: Array1<f64>,
    g_lg: Vec<Array1<f64>>,
    delta_lq: Array2<f64>,

    /// Rotation matrices per symmetry operation, set once after symmetry
    /// analysis
    r_sii: OnceCell<Vec<Array2<f64>>>,
}

impl Setup {
    /// Assemble the correction tensors from a dataset.
    ///
    /// # Arguments
    ///
    /// * `data` - The raw dataset
    /// * `lmax` - Compensation-charge expansion cutoff (0, 1 or 2)
    pub fn new(data: Arc<SetupData>, lmax: usize) -> Result<Setup> {
        let rgd = data.rgd();
        let l_j = data.l_j.clone();
        let nj = l_j.len();
        let sqrt4pi = (4.0 * PI).sqrt();

        // Packed index spaces
        let mut jll_i: Vec<(usize, usize, usize)> = Vec::new();
        for (j, &l) in l_j.iter().enumerate() {
            for m in 0..(2 * l + 1) {
                jll_i.push((j, l, l * l + m));
            }
        }
        let ni = jll_i.len();
        let np = ni * (ni + 1) / 2;
        let nq = nj * (nj + 1) / 2;

        let ljmax = l_j.iter().cloned().max().unwrap_or(0);
        let mut lcut = ljmax;
        if 2 * lcut < lmax {
            lcut = (lmax + 1) / 2;
        }

        let rcutmax = data
            .rcut_j
            .iter()
            .cloned()
            .fold(0.0f64, f64::max);
        let rcut2 = 2.0 * rcutmax;
        let gcut2 = rgd.ceil(rcut2);
        let rgd2 = rgd.truncated(gcut2);

        // Projector overlaps on the full grid
        let b_jj = {
            let mut b = Array2::zeros((nj, nj));
            for j1 in 0..nj {
                for j2 in 0..nj {
                    b[(j1, j2)] =
                        rgd.integrate(&(&data.pt_jg[j1] * &data.pt_jg[j2]), 0) / (4.0 * PI);
                }
            }
            b
        };
        let mut b_ii = Array2::zeros((ni, ni));
        for (i1, &(j1, l1, ll1)) in jll_i.iter().enumerate() {
            for (i2, &(j2, l2, ll2)) in jll_i.iter().enumerate() {
                if l1 == l2 && ll1 == ll2 {
                    b_ii[(i1, i2)] = b_jj[(j1, j2)];
                }
            }
        }

        // Truncated pair densities
        let truncate = |a_g: &Array1<f64>| -> Array1<f64> {
            Array1::from_iter(a_g.iter().take(gcut2).cloned())
        };
        let phi_jg: Vec<Array1<f64>> = data.phi_jg.iter().map(&truncate).collect();
        let phit_jg: Vec<Array1<f64>> = data.phit_jg.iter().map(&truncate).collect();
        let nc2_g = truncate(&data.nc_g);
        let nct2_g = truncate(&data.nct_g);
        let vbar2_g = truncate(&data.vbar_g);

        let mut n_qg = Array2::zeros((nq, gcut2));
        let mut nt_qg = Array2::zeros((nq, gcut2));
        let mut q = 0;
        for j1 in 0..nj {
            for j2 in j1..nj {
                for g in 0..gcut2 {
                    n_qg[(q, g)] = phi_jg[j1][g] * phi_jg[j2][g];
                    nt_qg[(q, g)] = phit_jg[j1][g] * phit_jg[j2][g];
                }
                q += 1;
            }
        }

        // Gaunt projection tensor T_Lqp
        let g_llm = gaunt(lcut.max(ljmax));
        let lcut_sq = (2 * lcut + 1) * (2 * lcut + 1);
        let mut t_lqp = Array3::zeros((lcut_sq, nq, np));
        {
            let mut p = 0;
            for (i1, &(j1, _, ll1)) in jll_i.iter().enumerate() {
                for &(j2, _, ll2) in jll_i.iter().skip(i1) {
                    let q = if j1 < j2 {
                        j2 + j1 * nj - j1 * (j1 + 1) / 2
                    } else {
                        j1 + j2 * nj - j2 * (j2 + 1) / 2
                    };
                    for big_l in 0..lcut_sq {
                        t_lqp[(big_l, q, p)] = g_llm[(ll1, ll2, big_l)];
                    }
                    p += 1;
                }
            }
        }

        // Compensation charges and their multipole expansion
        let g_lg: Vec<Array1<f64>> = data
            .create_compensation_charge_functions(lmax)
            .into_iter()
            .map(|g| truncate(&g))
            .collect();

        let weight = |n: i32| -> Array1<f64> {
            Array1::from_iter(
                (0..gcut2).map(|g| rgd2.r_g[g].powi(2 + n) * rgd2.dr_g[g]),
            )
        };
        let r2dr_g = weight(0);

        let mut delta_lq = Array2::zeros((lmax + 1, nq));
        for l in 0..=lmax {
            let w_g = weight(l as i32);
            for q in 0..nq {
                let mut s = 0.0;
                for g in 0..gcut2 {
                    s += (n_qg[(q, g)] - nt_qg[(q, g)]) * w_g[g];
                }
                delta_lq[(l, q)] = s;
            }
        }

        let lmax_sq = (lmax + 1) * (lmax + 1);
        let mut delta_pl = Array2::zeros((np, lmax_sq));
        for l in 0..=lmax {
            for m in 0..(2 * l + 1) {
                let big_l = l * l + m;
                for p in 0..np {
                    let mut s = 0.0;
                    for q in 0..nq {
                        s += delta_lq[(l, q)] * t_lqp[(big_l, q, p)];
                    }
                    delta_pl[(p, big_l)] = s;
                }
            }
        }

        let mut delta0 = -(data.z as f64) / sqrt4pi;
        for g in 0..gcut2 {
            delta0 += (nc2_g[g] - nct2_g[g]) * r2dr_g[g];
        }

        // Electron count inside the augmentation sphere
        let gcutmax = rgd.round(rcutmax);
        let mut n0_p = Array1::zeros(np);
        for p in 0..np {
            let mut s = 0.0;
            for q in 0..nq {
                let mut nq_int = 0.0;
                for g in 0..gcutmax.min(gcut2) {
                    nq_int += n_qg[(q, g)] * r2dr_g[g];
                }
                s += nq_int * t_lqp[(0, q, p)];
            }
            n0_p[p] = s * sqrt4pi;
        }

        // Electrostatic integrals: w = poisson(n) r dr for each density
        let hartree = |n_g: &Array1<f64>, l: i32| -> Array1<f64> {
            let vr_g = rgd2.poisson(n_g, l);
            Array1::from_iter(
                (0..gcut2).map(|g| vr_g[g] * rgd2.r_g[g] * rgd2.dr_g[g]),
            )
        };
        let row = |a_qg: &Array2<f64>, q: usize| -> Array1<f64> {
            Array1::from_iter((0..gcut2).map(|g| a_qg[(q, g)]))
        };

        let wg_lg: Vec<Array1<f64>> =
            (0..=lmax).map(|l| hartree(&g_lg[l], l as i32)).collect();
        let wn_lqg: Vec<Vec<Array1<f64>>> = (0..(2 * lcut + 1))
            .map(|l| {
                (0..nq)
                    .map(|q| hartree(&row(&n_qg, q), l as i32))
                    .collect()
            })
            .collect();
        let wnt_lqg: Vec<Vec<Array1<f64>>> = (0..(2 * lcut + 1))
            .map(|l| {
                (0..nq)
                    .map(|q| hartree(&row(&nt_qg, q), l as i32))
                    .collect()
            })
            .collect();
        let wnc_g = hartree(&nc2_g, 0);
        let wnct_g = hartree(&nct2_g, 0);
        let wmct_g = &wnct_g + &(&wg_lg[0] * delta0);

        let rdr_g: Array1<f64> =
            Array1::from_iter((0..gcut2).map(|g| rgd2.r_g[g] * rgd2.dr_g[g]));
        let dv_g: Array1<f64> =
            Array1::from_iter((0..gcut2).map(|g| rgd2.r_g[g] * rdr_g[g]));
        let mct_g = &nct2_g + &(&g_lg[0] * delta0);

        // Constant Coulomb correction
        let mut m = 0.5 * dot(&nc2_g, &wnc_g);
        m -= sqrt4pi * data.z as f64 * dot(&rdr_g, &nc2_g);
        m -= 0.5 * dot(&mct_g, &wmct_g);

        let mb = -dot(&(&dv_g * &nct2_g), &vbar2_g);
        let mut ab_q = Array1::zeros(nq);
        for q in 0..nq {
            let mut s = 0.0;
            for g in 0..gcut2 {
                s -= nt_qg[(q, g)] * dv_g[g] * vbar2_g[g];
            }
            ab_q[q] = s;
        }
        let mb_p = contract_q(&ab_q, &t_lqp, 0);

        // Average-electrostatic-potential corrections
        let mut deh0 = 0.0;
        for g in 0..gcut2 {
            deh0 += wnc_g[g] - wmct_g[g] - sqrt4pi * data.z as f64 * rdr_g[g];
        }
        deh0 *= sqrt4pi;
        let mut deh_q = Array1::zeros(nq);
        let wg0_sum: f64 = wg_lg[0].sum();
        for q in 0..nq {
            deh_q[q] =
                wn_lqg[0][q].sum() - wnt_lqg[0][q].sum() - delta_lq[(0, q)] * wg0_sum;
        }
        let deh_p = contract_q(&deh_q, &t_lqp, 0) * sqrt4pi;

        // Linear and quadratic Coulomb corrections
        let (m_p, m_pp) = coulomb_corrections(
            nq,
            np,
            lcut,
            lmax,
            &t_lqp,
            &n_qg,
            &nt_qg,
            &g_lg,
            &wg_lg,
            &wn_lqg,
            &wnt_lqg,
            &nc2_g,
            &wnc_g,
            &mct_g,
            &wmct_g,
            &delta_lq,
            &rdr_g,
            data.z as f64,
        );
        let m = m - data.e_electrostatic;

        let kc = data.e_kinetic_core - data.e_kinetic;
        let t0_qp = {
            let mut t = Array2::zeros((nq, np));
            for q in 0..nq {
                for p in 0..np {
                    t[(q, p)] = t_lqp[(0, q, p)];
                }
            }
            t
        };
        let k_p = data.get_linear_kinetic_correction(&t0_qp);

        // Overlap corrections
        let delta0_col = Array1::from_iter((0..np).map(|p| delta_pl[(p, 0)]));
        let delta0_ii = unpack(&delta0_col);
        let do_ii = data.get_overlap_correction(&delta0_ii);
        let dc_ii = inverse_overlap(&b_ii, &do_ii)?;

        let mut delta_iil = Array3::zeros((ni, ni, lmax_sq));
        for big_l in 0..lmax_sq {
            let col = Array1::from_iter((0..np).map(|p| delta_pl[(p, big_l)]));
            let full = unpack(&col);
            for i1 in 0..ni {
                for i2 in 0..ni {
                    delta_iil[(i1, i2, big_l)] = full[(i1, i2)];
                }
            }
        }

        let nct_integral = data.get_smooth_core_density_integral(delta0);
        let rcore = data.find_core_density_cutoff();

        // Spline representations
        let rcutfilter = rcutmax;
        let pt_j: Vec<Spline> = (0..nj)
            .map(|j| spline_from_radial(&rgd, &data.pt_jg[j], rcutfilter, l_j[j], 100))
            .collect();
        let phit_j: Vec<Spline> = (0..nj)
            .filter(|&j| data.n_j[j] > 0)
            .map(|j| {
                let cut_g = smooth_truncate(&rgd, &data.phit_jg[j], rcut2, 8.0);
                spline_from_radial(&rgd, &cut_g, 8.0f64.min(rgd.r_g[rgd.len() - 1]), l_j[j], 500)
            })
            .collect();
        let nao = (0..nj)
            .filter(|&j| data.n_j[j] > 0)
            .map(|j| 2 * l_j[j] + 1)
            .sum();

        let vbar = spline_from_radial(&rgd, &data.vbar_g, rcutfilter, 0, 200);
        let nct = spline_from_radial(&rgd, &data.nct_g, rcore.max(0.5), 0, 500);
        let tauct = spline_from_radial(&rgd, &data.tauct_g, rcore.max(0.5), 0, 500);
        let ghat_l: Vec<Spline> = data
            .create_compensation_charge_functions(lmax)
            .into_iter()
            .enumerate()
            .map(|(l, g_g)| spline_from_radial(&rgd, &g_g, rcut2, l, 200))
            .collect();

        Ok(Setup {
            symbol: data.symbol.clone(),
            z: data.z,
            nc_electrons: data.nc,
            nv_electrons: data.nv,
            l_j,
            nj,
            ni,
            nao,
            lmax,
            lmax_sq,
            lcut,
            rgd,
            rgd2,
            gcut2,
            b_ii,
            do_ii,
            dc_ii,
            delta_pl,
            delta_iil,
            delta0,
            n0_p,
            m,
            m_p,
            m_pp,
            kc,
            k_p,
            mb,
            mb_p,
            deh0,
            deh_p,
            e: data.e_total,
            exx_c: data.exx_c,
            x_p: data.x_p.clone(),
            nct_integral,
            rcore,
            pt_j,
            phit_j,
            vbar,
            nct,
            tauct,
            ghat_l,
            t_lqp,
            n_qg,
            nt_qg,
            nc2_g,
            nct2_g,
            g_lg,
            delta_lq,
            r_sii: OnceCell::new(),
            data,
        })
    }

    /// Quadratic correction matrix for screened (Yukawa) exchange,
    /// evaluated on demand for the given screening parameter
    pub fn calculate_yukawa_interaction(&self, gamma: f64) -> Array2<f64> {
        let gcut2 = self.gcut2;
        let rgd2 = &self.rgd2;
        let screened = |n_g: &Array1<f64>, l: i32| -> Array1<f64> {
            let vr_g = rgd2.yukawa(n_g, l, gamma);
            Array1::from_iter(
                (0..gcut2).map(|g| vr_g[g] * rgd2.r_g[g] * rgd2.dr_g[g]),
            )
        };
        let row = |a_qg: &Array2<f64>, q: usize| -> Array1<f64> {
            Array1::from_iter((0..gcut2).map(|g| a_qg[(q, g)]))
        };
        let nq = self.nj * (self.nj + 1) / 2;
        let np = self.ni * (self.ni + 1) / 2;

        let wg_lg: Vec<Array1<f64>> = (0..=self.lmax)
            .map(|l| screened(&self.g_lg[l], l as i32))
            .collect();
        let wn_lqg: Vec<Vec<Array1<f64>>> = (0..(2 * self.lcut + 1))
            .map(|l| {
                (0..nq)
                    .map(|q| screened(&row(&self.n_qg, q), l as i32))
                    .collect()
            })
            .collect();
        let wnt_lqg: Vec<Vec<Array1<f64>>> = (0..(2 * self.lcut + 1))
            .map(|l| {
                (0..nq)
                    .map(|q| screened(&row(&self.nt_qg, q), l as i32))
                    .collect()
            })
            .collect();
        let wnc_g = screened(&self.nc2_g, 0);
        let wnct_g = screened(&self.nct2_g, 0);
        let wmct_g = &wnct_g + &(&wg_lg[0] * self.delta0);
        let mct_g = &self.nct2_g + &(&self.g_lg[0] * self.delta0);
        let rdr_g: Array1<f64> =
            Array1::from_iter((0..gcut2).map(|g| rgd2.r_g[g] * rgd2.dr_g[g]));

        coulomb_corrections(
            nq,
            np,
            self.lcut,
            self.lmax,
            &self.t_lqp,
            &self.n_qg,
            &self.nt_qg,
            &self.g_lg,
            &wg_lg,
            &wn_lqg,
            &wnt_lqg,
            &self.nc2_g,
            &wnc_g,
            &mct_g,
            &wmct_g,
            &self.delta_lq,
            &rdr_g,
            self.z as f64,
        )
        .1
    }

    /// Store the rotation matrices for the symmetry operations.  May be
    /// called once; later calls are ignored (the setup stays immutable).
    pub fn calculate_rotations(&self, r_slmm: &[Vec<Array2<f64>>]) {
        let mut r_sii = Vec::with_capacity(r_slmm.len());
        for r_lmm in r_slmm {
            let mut r_ii = Array2::zeros((self.ni, self.ni));
            let mut i1 = 0;
            for &l in &self.l_j {
                let nm = 2 * l + 1;
                for m1 in 0..nm {
                    for m2 in 0..nm {
                        r_ii[(i1 + m1, i1 + m2)] = r_lmm[l][(m1, m2)];
                    }
                }
                i1 += nm;
            }
            r_sii.push(r_ii);
        }
        let _ = self.r_sii.set(r_sii);
    }

    /// Rotation matrices, if symmetry has been attached
    pub fn rotations(&self) -> Option<&Vec<Array2<f64>>> {
        self.r_sii.get()
    }

    /// Symmetrize an atomic density-matrix block.
    ///
    /// # Arguments
    ///
    /// * `a` - Atom index
    /// * `d_aii` - Density-matrix blocks for all atoms
    /// * `map_sa` - Atom permutation per symmetry operation
    pub fn symmetrize(
        &self,
        a: usize,
        d_aii: &[Array2<f64>],
        map_sa: &[Vec<usize>],
    ) -> Array2<f64> {
        let r_sii = self.r_sii.get().expect("rotations not initialized");
        let mut d_ii = Array2::zeros((self.ni, self.ni));
        for (s, r_ii) in r_sii.iter().enumerate() {
            let d = &d_aii[map_sa[s][a]];
            // R D R^T
            for i1 in 0..self.ni {
                for i2 in 0..self.ni {
                    let mut sum = 0.0;
                    for k1 in 0..self.ni {
                        for k2 in 0..self.ni {
                            sum += r_ii[(i1, k1)] * d[(k1, k2)] * r_ii[(i2, k2)];
                        }
                    }
                    d_ii[(i1, i2)] += sum;
                }
            }
        }
        d_ii / map_sa.len() as f64
    }
}

fn dot(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Contract a q vector with one L slice of T_Lqp
fn contract_q(a_q: &Array1<f64>, t_lqp: &Array3<f64>, big_l: usize) -> Array1<f64> {
    let (_, nq, np) = t_lqp.dim();
    let mut out = Array1::zeros(np);
    for p in 0..np {
        for q in 0..nq {
            out[p] += a_q[q] * t_lqp[(big_l, q, p)];
        }
    }
    out
}

/// dC_ii = -dO (1 + B dO)^-1
fn inverse_overlap(b_ii: &Array2<f64>, do_ii: &Array2<f64>) -> Result<Array2<f64>> {
    let ni = b_ii.nrows();
    let mut x = Array2::zeros((ni, ni));
    for i in 0..ni {
        x[(i, i)] = 1.0;
    }
    // X = 1 + B dO
    for i in 0..ni {
        for j in 0..ni {
            for k in 0..ni {
                x[(i, j)] += b_ii[(i, k)] * do_ii[(k, j)];
            }
        }
    }
    let xinv = invert(&ndarray_to_faer(&x))?;
    let mut out = Array2::zeros((ni, ni));
    for i in 0..ni {
        for j in 0..ni {
            for k in 0..ni {
                out[(i, j)] -= do_ii[(i, k)] * xinv[(k, j)];
            }
        }
    }
    Ok(out)
}

/// The shared Coulomb-correction contraction: returns (M_p, M_pp)
#[allow(clippy::too_many_arguments)]
fn coulomb_corrections(
    nq: usize,
    np: usize,
    lcut: usize,
    lmax: usize,
    t_lqp: &Array3<f64>,
    n_qg: &Array2<f64>,
    nt_qg: &Array2<f64>,
    g_lg: &[Array1<f64>],
    wg_lg: &[Array1<f64>],
    wn_lqg: &[Vec<Array1<f64>>],
    wnt_lqg: &[Vec<Array1<f64>>],
    nc_g: &Array1<f64>,
    wnc_g: &Array1<f64>,
    mct_g: &Array1<f64>,
    wmct_g: &Array1<f64>,
    delta_lq: &Array2<f64>,
    rdr_g: &Array1<f64>,
    z: f64,
) -> (Array1<f64>, Array2<f64>) {
    let sqrt4pi = (4.0 * PI).sqrt();
    let gcut2 = nc_g.len();

    // Linear correction
    let mut a_q = Array1::zeros(nq);
    for q in 0..nq {
        let mut s = 0.0;
        for g in 0..gcut2 {
            s += 0.5 * (wn_lqg[0][q][g] * nc_g[g] + n_qg[(q, g)] * wnc_g[g]);
            s -= sqrt4pi * z * n_qg[(q, g)] * rdr_g[g];
            s -= 0.5 * (wnt_lqg[0][q][g] * mct_g[g] + nt_qg[(q, g)] * wmct_g[g]);
            s -= 0.5 * (mct_g[g] * wg_lg[0][g] + g_lg[0][g] * wmct_g[g]) * delta_lq[(0, q)];
        }
        a_q[q] = s;
    }
    let m_p = contract_q(&a_q, t_lqp, 0);

    // Quadratic correction, channel by channel
    let mut a_lqq: Vec<Array2<f64>> = Vec::with_capacity(2 * lcut + 1);
    for l in 0..(2 * lcut + 1) {
        let mut a_qq = Array2::zeros((nq, nq));
        for q1 in 0..nq {
            for q2 in 0..nq {
                let mut s = 0.0;
                for g in 0..gcut2 {
                    s += 0.5 * n_qg[(q1, g)] * wn_lqg[l][q2][g];
                    s -= 0.5 * nt_qg[(q1, g)] * wnt_lqg[l][q2][g];
                }
                if l <= lmax {
                    let mut t1 = 0.0;
                    let mut t2 = 0.0;
                    let mut t3 = 0.0;
                    for g in 0..gcut2 {
                        t1 += wnt_lqg[l][q2][g] * g_lg[l][g];
                        t2 += nt_qg[(q1, g)] * wg_lg[l][g];
                        t3 += g_lg[l][g] * wg_lg[l][g];
                    }
                    s -= 0.5 * delta_lq[(l, q1)] * t1;
                    s -= 0.5 * t2 * delta_lq[(l, q2)];
                    s -= 0.5 * t3 * delta_lq[(l, q1)] * delta_lq[(l, q2)];
                }
                a_qq[(q1, q2)] = s;
            }
        }
        a_lqq.push(a_qq);
    }

    let mut m_pp = Array2::zeros((np, np));
    let mut big_l = 0;
    for (l, a_qq) in a_lqq.iter().enumerate() {
        for _m in 0..(2 * l + 1) {
            // M_pp += T_L^T A T_L
            for p1 in 0..np {
                for p2 in 0..np {
                    let mut s = 0.0;
                    for q1 in 0..nq {
                        let t1 = t_lqp[(big_l, q1, p1)];
                        if t1 == 0.0 {
                            continue;
                        }
                        for q2 in 0..nq {
                            s += t1 * a_qq[(q1, q2)] * t_lqp[(big_l, q2, p2)];
                        }
                    }
                    m_pp[(p1, p2)] += s;
                }
            }
            big_l += 1;
        }
    }

    (m_p, m_pp)
}

/// Smoothly truncate a radial function: untouched below rcut2, blended to
/// zero between rcut2 and rcut3 with fourth-order polynomials matching
/// value and slope
fn smooth_truncate(
    rgd: &RadialGrid,
    f_g: &Array1<f64>,
    rcut2: f64,
    rcut3: f64,
) -> Array1<f64> {
    let mut out = f_g.clone();
    let gcut2 = rgd.ceil(rcut2);
    let gcut3 = rgd.ceil(rcut3.min(rgd.r_g[rgd.len() - 1]));
    if gcut3 <= gcut2 + 1 {
        return out;
    }
    let f3 = f_g[gcut3];
    let df3 = (f_g[gcut3] - f_g[gcut3 - 1]) / (rgd.r_g[gcut3] - rgd.r_g[gcut3 - 1]);
    for g in gcut2..gcut3 {
        let x = (rgd.r_g[g] - rcut2) / (rcut3.min(rgd.r_g[rgd.len() - 1]) - rcut2);
        let a = 4.0 * x * x * x * (1.0 - 0.75 * x);
        let b = x * x * x * (x - 1.0) * (rcut3.min(rgd.r_g[rgd.len() - 1]) - rcut2);
        out[g] -= f3 * a + df3 * b;
    }
    for g in gcut3..rgd.len() {
        out[g] = 0.0;
    }
    out
}

/// Resample a function from the radial grid onto an equidistant spline
pub fn spline_from_radial(
    rgd: &RadialGrid,
    f_g: &Array1<f64>,
    rcut: f64,
    l: usize,
    points: usize,
) -> Spline {
    let n = points.max(4);
    let mut f_i = Vec::with_capacity(n);
    for i in 0..n {
        let r = i as f64 * rcut / (n - 1) as f64;
        let x = rgd.n as f64 * r / (rgd.beta + r);
        let g = (x as usize).min(rgd.len().saturating_sub(2));
        let t = x - g as f64;
        let value = if g + 1 < f_g.len() {
            (1.0 - t) * f_g[g] + t * f_g[g + 1]
        } else {
            0.0
        };
        f_i.push(value);
    }
    // Force an exact zero at the cutoff
    if let Some(last) = f_i.last_mut() {
        *last = 0.0;
    }
    Spline::new(l, rcut, f_i)
}
