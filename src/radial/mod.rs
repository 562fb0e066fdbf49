/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Non-uniform radial grids
//!
//! The all-electron atom and the PAW generator work on the grid
//! r(g) = b g / (n - g) for g = 0 .. n-1, which packs points tightly
//! around the nucleus and stretches towards infinity.  [`RadialGrid`]
//! provides differentiation, weighted integration, radial Poisson and
//! Yukawa solvers, spectral (Fourier-sine) transforms and the
//! pseudization used to construct smooth partial waves.

pub mod errors;
pub mod spline;

pub use errors::{RadialError, Result};
pub use spline::Spline;

use crate::utils::linear_algebra;
use faer::Mat;
use ndarray::Array1;
use std::f64::consts::PI;

/// Radial grid with the mapping r(g) = b g / (n - g)
#[derive(Debug, Clone)]
pub struct RadialGrid {
    /// Scale parameter b (Bohr)
    pub beta: f64,
    /// Number of grid points
    pub n: usize,
    /// Radii r(g)
    pub r_g: Array1<f64>,
    /// Jacobian dr/dg
    pub dr_g: Array1<f64>,
}

impl RadialGrid {
    /// Create a radial grid.
    ///
    /// # Arguments
    ///
    /// * `beta` - Scale parameter; half of the points lie inside r = beta
    /// * `n` - Number of points
    pub fn new(beta: f64, n: usize) -> Self {
        let r_g = Array1::from_iter(
            (0..n).map(|g| beta * g as f64 / (n - g) as f64),
        );
        let dr_g = Array1::from_iter(
            (0..n).map(|g| beta * n as f64 / ((n - g) as f64).powi(2)),
        );
        RadialGrid { beta, n, r_g, dr_g }
    }

    /// New grid with the same mapping truncated to the first `gcut` points
    pub fn truncated(&self, gcut: usize) -> RadialGrid {
        RadialGrid {
            beta: self.beta,
            n: self.n,
            r_g: self.r_g.slice(ndarray::s![..gcut]).to_owned(),
            dr_g: self.dr_g.slice(ndarray::s![..gcut]).to_owned(),
        }
    }

    /// Number of stored grid points
    pub fn len(&self) -> usize {
        self.r_g.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r_g.is_empty()
    }

    /// Fractional grid index of radius r (inverse mapping)
    fn index_of(&self, r: f64) -> f64 {
        self.n as f64 * r / (self.beta + r)
    }

    /// Smallest grid index with r_g >= r
    pub fn ceil(&self, r: f64) -> usize {
        (self.index_of(r).ceil() as usize).min(self.len() - 1)
    }

    /// Largest grid index with r_g <= r
    pub fn floor(&self, r: f64) -> usize {
        (self.index_of(r).floor() as usize).min(self.len() - 1)
    }

    /// Grid index nearest to radius r
    pub fn round(&self, r: f64) -> usize {
        (self.index_of(r).round() as usize).min(self.len() - 1)
    }

    /// New zeroed array over the grid
    pub fn zeros(&self) -> Array1<f64> {
        Array1::zeros(self.len())
    }

    /// Integrate a function against r^(2+n) dr, times 4 pi.
    ///
    /// The default weight (n = 0) gives the 3D integral of a spherical
    /// function; n = -1 weights by 1/r (Coulomb-type integrals).  The
    /// point at r = 0 is excluded, so negative powers are safe.
    pub fn integrate(&self, a_g: &Array1<f64>, n: i32) -> f64 {
        let mut sum = 0.0;
        for g in 1..a_g.len().min(self.len()) {
            sum += a_g[g] * self.r_g[g].powi(2 + n) * self.dr_g[g];
        }
        4.0 * PI * sum
    }

    /// Pairwise integrals dS[n1, n2] = 4 pi ∫ a_n1 b_n2 r² dr
    pub fn integrate_pairs(&self, a_ng: &[Array1<f64>], b_ng: &[Array1<f64>]) -> ndarray::Array2<f64> {
        let mut out = ndarray::Array2::zeros((a_ng.len(), b_ng.len()));
        for (i, a_g) in a_ng.iter().enumerate() {
            for (j, b_g) in b_ng.iter().enumerate() {
                out[(i, j)] = self.integrate(&(a_g * b_g), 0);
            }
        }
        out
    }

    /// Radial derivative da/dr via central differences on the index grid
    pub fn derivative(&self, a_g: &Array1<f64>) -> Array1<f64> {
        let n = a_g.len();
        let mut d_g = Array1::zeros(n);
        if n < 2 {
            return d_g;
        }
        d_g[0] = (a_g[1] - a_g[0]) / self.dr_g[0];
        for g in 1..n - 1 {
            d_g[g] = 0.5 * (a_g[g + 1] - a_g[g - 1]) / self.dr_g[g];
        }
        d_g[n - 1] = (a_g[n - 1] - a_g[n - 2]) / self.dr_g[n - 1];
        d_g
    }

    /// Second derivative of the index mapping, d²g/dr²
    ///
    /// For r = b g / (n - g) this is -2 n b / (b + r)³; it converts
    /// index-space second differences into radial derivatives.
    pub fn d2gdr2(&self) -> Array1<f64> {
        Array1::from_iter(self.r_g.iter().map(|&r| {
            -2.0 * self.n as f64 * self.beta / (self.beta + r).powi(3)
        }))
    }

    /// Zero a function beyond a cutoff radius
    pub fn cut(&self, a_g: &mut Array1<f64>, rcut: f64) {
        for g in 0..a_g.len() {
            if self.r_g[g] > rcut {
                a_g[g] = 0.0;
            }
        }
    }

    /// Solve the radial Poisson equation for an l-channel density.
    ///
    /// # Arguments
    ///
    /// * `n_g` - Radial part of the density component
    /// * `l` - Angular momentum of the channel
    ///
    /// # Returns
    ///
    /// r times the electrostatic potential, vr(r) = r V(r), with
    ///
    /// V(r) = 4 pi / (2l+1) [ r^-(l+1) ∫_0^r n r'^(l+2) dr'
    ///                        + r^l ∫_r^inf n r'^(1-l) dr' ]
    pub fn poisson(&self, n_g: &Array1<f64>, l: i32) -> Array1<f64> {
        let ng = n_g.len().min(self.len());
        let mut inner = vec![0.0; ng];
        let mut outer = vec![0.0; ng];

        // Cumulative trapezoid of n r^(l+2) dr from the origin outwards
        let f = |g: usize| n_g[g] * self.r_g[g].powi(l + 2) * self.dr_g[g];
        for g in 1..ng {
            inner[g] = inner[g - 1] + 0.5 * (f(g - 1) + f(g));
        }
        // and of n r^(1-l) dr from the outside in (skip r = 0 where the
        // weight can diverge for l > 1)
        let h = |g: usize| {
            if g == 0 {
                0.0
            } else {
                n_g[g] * self.r_g[g].powi(1 - l) * self.dr_g[g]
            }
        };
        for g in (0..ng - 1).rev() {
            outer[g] = outer[g + 1] + 0.5 * (h(g) + h(g + 1));
        }

        let mut vr_g = Array1::zeros(ng);
        for g in 1..ng {
            let r = self.r_g[g];
            vr_g[g] = 4.0 * PI / (2 * l + 1) as f64
                * (inner[g] / r.powi(l) + outer[g] * r.powi(l + 1));
        }
        vr_g
    }

    /// Solve the screened (Yukawa) radial Poisson equation.
    ///
    /// Same contract as [`RadialGrid::poisson`] but with the kernel
    /// exp(-gamma |r - r'|) / |r - r'|, expanded in modified spherical
    /// Bessel functions i_l and k_l.
    pub fn yukawa(&self, n_g: &Array1<f64>, l: i32, gamma: f64) -> Array1<f64> {
        let ng = n_g.len().min(self.len());
        // The density has compact support; beyond it only the decaying
        // outer solution k_l survives, which keeps i_l out of the
        // overflow regime.
        let mut gmax = 0;
        for g in 0..ng {
            if n_g[g] != 0.0 {
                gmax = g;
            }
        }
        gmax = (gmax + 2).min(ng);

        let f = |g: usize| {
            n_g[g] * bessel_i(l, gamma * self.r_g[g]) * self.r_g[g].powi(2) * self.dr_g[g]
        };
        let h = |g: usize| {
            if g == 0 {
                0.0
            } else {
                n_g[g] * bessel_k(l, gamma * self.r_g[g]) * self.r_g[g].powi(2) * self.dr_g[g]
            }
        };

        let mut inner = vec![0.0; gmax];
        let mut outer = vec![0.0; gmax];
        for g in 1..gmax {
            inner[g] = inner[g - 1] + 0.5 * (f(g - 1) + f(g));
        }
        for g in (0..gmax - 1).rev() {
            outer[g] = outer[g + 1] + 0.5 * (h(g) + h(g + 1));
        }

        let mut vr_g = Array1::zeros(ng);
        for g in 1..ng {
            let r = self.r_g[g];
            let x = gamma * r;
            vr_g[g] = if g < gmax {
                4.0 * PI
                    * gamma
                    * (bessel_k(l, x) * inner[g] + bessel_i(l, x) * outer[g])
                    * r
            } else {
                4.0 * PI * gamma * bessel_k(l, x) * inner[gmax - 1] * r
            };
        }
        vr_g
    }

    /// Replace a function inside a cutoff with a smooth even polynomial.
    ///
    /// The replacement is r^l (c_0 + c_1 r² + ... + c_(P-1) r^(2P-2)),
    /// with the P coefficients fixed by matching the original function at
    /// the grid points gc, gc+1, ..., gc+P-1.  The even powers make the
    /// result analytic through the origin for an l-channel function.
    ///
    /// # Arguments
    ///
    /// * `a_g` - Function to pseudize
    /// * `gc` - First grid index of the matching window
    /// * `l` - Angular momentum of the function
    /// * `points` - Number of polynomial coefficients P (default 4 in the
    ///   callers)
    ///
    /// # Returns
    ///
    /// The pseudized function and the coefficient c_0 (the r -> 0 limit
    /// of a / r^l)
    pub fn pseudize(
        &self,
        a_g: &Array1<f64>,
        gc: usize,
        l: usize,
        points: usize,
    ) -> Result<(Array1<f64>, f64)> {
        if gc < 1 || gc + points > self.len() {
            return Err(RadialError::Pseudize(format!(
                "matching window [{}, {}) outside grid of {} points",
                gc,
                gc + points,
                self.len()
            )));
        }
        let c = self.fit_even_polynomial(a_g, gc, l, points)?;
        let mut b_g = a_g.clone();
        for g in 0..gc {
            b_g[g] = self.eval_even_polynomial(&c, g, l);
        }
        Ok((b_g, c[0]))
    }

    /// Norm-conserving variant of [`RadialGrid::pseudize`].
    ///
    /// One extra even power is added and its weight chosen so that the
    /// norm ∫ a² r² dr is preserved, solving the resulting quadratic
    /// exactly.
    pub fn pseudize_normalized(
        &self,
        a_g: &Array1<f64>,
        gc: usize,
        l: usize,
        points: usize,
    ) -> Result<(Array1<f64>, f64)> {
        let (b_g, c0_b) = self.pseudize(a_g, gc, l, points)?;

        // u is the direction in function space generated by the extra
        // power r^(l + 2P), corrected to keep the matching conditions.
        let mut t_g = self.zeros();
        for g in 0..self.len() {
            t_g[g] = self.r_g[g].powi((l + 2 * points) as i32);
        }
        let e = self.fit_even_polynomial(&t_g, gc, l, points)?;
        let mut u_g = self.zeros();
        for g in 0..gc {
            u_g[g] = t_g[g] - self.eval_even_polynomial(&e, g, l);
        }

        // Norm condition on [0, r(gc)): quadratic in the admixture d
        let mut p2 = 0.0;
        let mut p1 = 0.0;
        let mut p0 = 0.0;
        for g in 1..gc {
            let w = self.r_g[g] * self.r_g[g] * self.dr_g[g];
            p2 += u_g[g] * u_g[g] * w;
            p1 += 2.0 * b_g[g] * u_g[g] * w;
            p0 += (b_g[g] * b_g[g] - a_g[g] * a_g[g]) * w;
        }
        let disc = p1 * p1 - 4.0 * p2 * p0;
        if disc < 0.0 || p2 == 0.0 {
            return Err(RadialError::Pseudize(
                "norm-conserving constraint cannot be met".to_string(),
            ));
        }
        // Root with the smaller magnitude keeps the correction gentle
        let d1 = (-p1 + disc.sqrt()) / (2.0 * p2);
        let d2 = (-p1 - disc.sqrt()) / (2.0 * p2);
        let d = if d1.abs() < d2.abs() { d1 } else { d2 };

        let mut out = b_g;
        for g in 0..gc {
            out[g] += d * u_g[g];
        }
        // r -> 0 limit of a / r^l: the r^(l+2P) admixture contributes only
        // through the matching correction -e_0
        let c0 = c0_b - d * e[0];
        Ok((out, c0))
    }

    fn fit_even_polynomial(
        &self,
        a_g: &Array1<f64>,
        gc: usize,
        l: usize,
        points: usize,
    ) -> Result<Vec<f64>> {
        let mut m = Mat::<f64>::zeros(points, points);
        let mut rhs = vec![0.0; points];
        for p in 0..points {
            let r = self.r_g[gc + p];
            for i in 0..points {
                m[(p, i)] = r.powi(2 * i as i32);
            }
            rhs[p] = a_g[gc + p] / r.powi(l as i32);
        }
        Ok(linear_algebra::solve_vec(&m, &rhs)?)
    }

    fn eval_even_polynomial(&self, c: &[f64], g: usize, l: usize) -> f64 {
        let r = self.r_g[g];
        let r2 = r * r;
        let mut s = 0.0;
        for &ci in c.iter().rev() {
            s = s * r2 + ci;
        }
        s * r.powi(l as i32)
    }

    /// Fourier-sine transform used for plane-wave convergence estimates.
    ///
    /// # Arguments
    ///
    /// * `fr_g` - r times the radial function f(r)
    ///
    /// # Returns
    ///
    /// The reciprocal grid G_k and f(G) = 4 pi / G ∫ f(r) r sin(G r) dr
    pub fn fft(&self, fr_g: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let nk = 1024;
        let rmax = 50.0;
        let nr = 2048;
        let dr = rmax / nr as f64;

        // Interpolate r f(r) onto an equidistant grid
        let mut fr_i = vec![0.0; nr];
        for i in 0..nr {
            let r = i as f64 * dr;
            let x = self.index_of(r);
            let g = x.floor() as usize;
            if g + 1 >= self.len() || g + 1 >= fr_g.len() {
                break;
            }
            let t = x - g as f64;
            fr_i[i] = (1.0 - t) * fr_g[g] + t * fr_g[g + 1];
        }

        let dk = PI / rmax;
        let mut g_k = Array1::zeros(nk);
        let mut f_k = Array1::zeros(nk);
        for k in 1..nk {
            let gk = k as f64 * dk;
            let mut s = 0.0;
            for (i, &fr) in fr_i.iter().enumerate() {
                s += fr * (gk * i as f64 * dr).sin();
            }
            g_k[k] = gk;
            f_k[k] = 4.0 * PI / gk * s * dr;
        }
        g_k[0] = 0.0;
        f_k[0] = f_k[1];
        (g_k, f_k)
    }
}

/// Modified spherical Bessel function of the first kind, i_l(x)
///
/// Series evaluation; accurate for the moderate arguments reached inside
/// the augmentation region.
fn bessel_i(l: i32, x: f64) -> f64 {
    if x == 0.0 {
        return if l == 0 { 1.0 } else { 0.0 };
    }
    // i_l(x) = x^l / (2l+1)!! sum_k (x²/2)^k / (k! (2l+2k+1)!!)
    let mut dfac = 1.0;
    for j in 1..=l {
        dfac *= (2 * j + 1) as f64;
    }
    let x2h = 0.5 * x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..200 {
        term *= x2h / (k as f64 * (2 * l + 2 * k + 1) as f64);
        sum += term;
        if term < 1e-17 * sum {
            break;
        }
    }
    x.powi(l) / dfac * sum
}

/// Modified spherical Bessel function of the second kind, k_l(x)
/// (convention k_0(x) = exp(-x)/x)
fn bessel_k(l: i32, x: f64) -> f64 {
    if x <= 0.0 {
        return f64::INFINITY;
    }
    let k0 = (-x).exp() / x;
    if l == 0 {
        return k0;
    }
    let k1 = (-x).exp() * (1.0 / x + 1.0 / (x * x));
    if l == 1 {
        return k1;
    }
    // Upward recurrence is stable for k_l
    let mut km = k0;
    let mut k = k1;
    for j in 1..l {
        let next = km + (2 * j + 1) as f64 / x * k;
        km = k;
        k = next;
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> RadialGrid {
        RadialGrid::new(0.4, 600)
    }

    #[test]
    fn test_mapping_and_indices() {
        let rgd = grid();
        assert_eq!(rgd.r_g[0], 0.0);
        let r = rgd.r_g[123];
        assert_eq!(rgd.round(r), 123);
        assert_eq!(rgd.ceil(r * 0.999), 123);
        assert_eq!(rgd.floor(r * 1.001), 123);
    }

    #[test]
    fn test_integrate_gaussian_norm() {
        // 4 pi ∫ exp(-r²) r² dr = pi^(3/2)
        let rgd = grid();
        let n_g = rgd.r_g.mapv(|r| (-r * r).exp());
        assert_relative_eq!(
            rgd.integrate(&n_g, 0),
            PI.powf(1.5),
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_derivative_of_polynomial() {
        let rgd = grid();
        let a_g = rgd.r_g.mapv(|r| r * r);
        let d_g = rgd.derivative(&a_g);
        for g in (50..300).step_by(37) {
            assert_relative_eq!(d_g[g], 2.0 * rgd.r_g[g], max_relative = 1e-4);
        }
    }

    #[test]
    fn test_poisson_gaussian() {
        // For n(r) = (alpha/pi)^(3/2) exp(-alpha r²) (unit charge), the
        // potential is V(r) = erf(sqrt(alpha) r) / r.
        let rgd = grid();
        let alpha = 3.0;
        let n_g = rgd.r_g.mapv(|r| (alpha / PI).powf(1.5) * (-alpha * r * r).exp());
        let vr_g = rgd.poisson(&n_g, 0);
        for g in (20..400).step_by(25) {
            let r = rgd.r_g[g];
            let exact = crate::utils::math::erf(alpha.sqrt() * r);
            assert_relative_eq!(vr_g[g], exact, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_yukawa_matches_poisson_for_small_gamma() {
        let rgd = grid();
        let alpha = 3.0;
        let n_g = rgd.r_g.mapv(|r| (alpha / PI).powf(1.5) * (-alpha * r * r).exp());
        let vr_g = rgd.poisson(&n_g, 0);
        let vyr_g = rgd.yukawa(&n_g, 0, 1e-4);
        for g in (20..200).step_by(30) {
            assert_relative_eq!(vyr_g[g], vr_g[g], max_relative = 1e-3);
        }
    }

    #[test]
    fn test_yukawa_screened_point_like_charge() {
        // A tight Gaussian approximates a point charge; outside it the
        // screened potential is exp(-gamma r)/r.
        let rgd = grid();
        let alpha = 150.0;
        let gamma = 0.8;
        let n_g = rgd.r_g.mapv(|r| (alpha / PI).powf(1.5) * (-alpha * r * r).exp());
        let vr_g = rgd.yukawa(&n_g, 0, gamma);
        for g in (rgd.round(1.0)..rgd.round(4.0)).step_by(40) {
            let r = rgd.r_g[g];
            assert_relative_eq!(vr_g[g], (-gamma * r).exp(), max_relative = 1e-3);
        }
    }

    #[test]
    fn test_pseudize_matches_value_and_derivatives() {
        let rgd = grid();
        let a_g = rgd.r_g.mapv(|r| r * (-0.5 * r * r).exp());
        let gc = rgd.ceil(1.1);
        let points = 6;
        let (b_g, c0) = rgd.pseudize(&a_g, gc, 1, points).unwrap();

        // Exact agreement on the matching window
        for p in 0..points {
            assert_relative_eq!(b_g[gc + p], a_g[gc + p], max_relative = 1e-10);
        }
        // Smooth continuation: l = 1 function vanishes linearly at 0
        assert_relative_eq!(b_g[0], 0.0, epsilon = 1e-12);
        assert!(c0.is_finite());
        // Derivative continuity across the cutoff (finite-difference)
        let db = rgd.derivative(&b_g);
        let da = rgd.derivative(&a_g);
        assert_relative_eq!(db[gc], da[gc], max_relative = 1e-6);
    }

    #[test]
    fn test_pseudize_normalized_preserves_norm() {
        let rgd = grid();
        // A nodeless 1s-like function
        let a_g = rgd.r_g.mapv(|r| (-1.3 * r).exp());
        let gc = rgd.ceil(1.0);
        let (b_g, _) = rgd.pseudize_normalized(&a_g, gc, 0, 4).unwrap();
        let na = rgd.integrate(&a_g.mapv(|x| x * x), 0);
        let nb = rgd.integrate(&b_g.mapv(|x| x * x), 0);
        assert_relative_eq!(na, nb, max_relative = 1e-8);
    }

    #[test]
    fn test_bessel_limits() {
        assert_relative_eq!(bessel_i(0, 1e-8), 1.0, epsilon = 1e-12);
        // i_0 = sinh(x)/x
        assert_relative_eq!(bessel_i(0, 0.7), 0.7f64.sinh() / 0.7, epsilon = 1e-12);
        // i_1 = (x cosh x - sinh x)/x²
        let x: f64 = 1.3;
        assert_relative_eq!(
            bessel_i(1, x),
            (x * x.cosh() - x.sinh()) / (x * x),
            epsilon = 1e-12
        );
        // k_l recurrence against the closed form for l=2:
        // k_2 = e^-x (1/x + 3/x² + 3/x³)
        let x = 0.9;
        assert_relative_eq!(
            bessel_k(2, x),
            (-x).exp() * (1.0 / x + 3.0 / (x * x) + 3.0 / (x * x * x)),
            epsilon = 1e-12
        );
    }
}
