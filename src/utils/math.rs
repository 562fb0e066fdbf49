/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! Mathematical utility functions
//!
//! Special functions needed by the radial solvers and the angular-momentum
//! algebra: the error function, factorials, associated Legendre polynomials
//! and real spherical harmonics.

use super::errors::{Result, UtilsError};
use std::f64::consts::PI;

/// Calculate the factorial of n
///
/// # Arguments
///
/// * `n` - The non-negative integer for which to calculate the factorial
///
/// # Returns
///
/// The factorial of n or None if n is too large for u64
pub fn factorial(n: u32) -> Option<u64> {
    match n {
        0 | 1 => Some(1),
        n if n <= 20 => {
            let mut result = 1u64;
            for i in 2..=n {
                result = result.checked_mul(i as u64)?;
            }
            Some(result)
        }
        _ => None,
    }
}

/// Calculate the double factorial n!!
///
/// n!! = n × (n-2) × (n-4) × ... × (1 or 2)
pub fn double_factorial(n: u32) -> Option<u64> {
    match n {
        0 | 1 => Some(1),
        n if n <= 33 => {
            let mut result = 1u64;
            let mut i = n;
            while i > 0 {
                result = result.checked_mul(i as u64)?;
                if i < 2 {
                    break;
                }
                i -= 2;
            }
            Some(result)
        }
        _ => None,
    }
}

/// Greatest common divisor of two non-negative integers
pub fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// The error function erf(x)
///
/// Uses the Taylor series for |x| < 2 and the Lentz continued-fraction
/// evaluation of erfc for larger arguments, so that the complementary
/// error function keeps full relative accuracy in the tail.  The tail
/// accuracy matters for the compensation-charge spillage criterion, which
/// probes erfc at values around 1e-10.
pub fn erf(x: f64) -> f64 {
    if x < 0.0 {
        return -erf(-x);
    }
    if x < 2.0 {
        // erf(x) = 2/sqrt(pi) * sum_k (-1)^k x^(2k+1) / (k! (2k+1))
        let mut term = x;
        let mut sum = x;
        let x2 = x * x;
        for k in 1..200 {
            term *= -x2 / k as f64;
            let contrib = term / (2 * k + 1) as f64;
            sum += contrib;
            if contrib.abs() < 1e-17 * sum.abs() {
                break;
            }
        }
        2.0 / PI.sqrt() * sum
    } else {
        1.0 - erfc(x)
    }
}

/// The complementary error function erfc(x) = 1 - erf(x)
pub fn erfc(x: f64) -> f64 {
    if x < 2.0 {
        return 1.0 - erf(x);
    }
    // Continued fraction: erfc(x) = exp(-x^2)/sqrt(pi) *
    //   1/(x + (1/2)/(x + 1/(x + (3/2)/(x + ...))))
    // evaluated with the modified Lentz algorithm.
    let tiny = 1e-300;
    let mut f = x;
    let mut c = x / tiny;
    let mut d = 0.0;
    for n in 1..300 {
        let a = 0.5 * n as f64;
        d = x + a * d;
        if d.abs() < tiny {
            d = tiny;
        }
        c = x + a / c;
        if c.abs() < tiny {
            c = tiny;
        }
        d = 1.0 / d;
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).abs() < 1e-16 {
            break;
        }
    }
    (-x * x).exp() / PI.sqrt() / f
}

/// Associated Legendre polynomial P_l^m(x) with the Condon-Shortley phase
///
/// # Arguments
///
/// * `l` - The degree of the polynomial (l >= 0)
/// * `m` - The order of the polynomial (0 <= m <= l)
/// * `x` - The input value (-1 <= x <= 1)
pub fn associated_legendre(l: i32, m: i32, x: f64) -> Result<f64> {
    if l < 0 || m < 0 || m > l || !(-1.0..=1.0).contains(&x) {
        return Err(UtilsError::Math(format!(
            "Invalid parameters for associated Legendre polynomial: l={}, m={}, x={}",
            l, m, x
        )));
    }

    // P_m^m via the closed form (-1)^m (2m-1)!! (1-x^2)^(m/2)
    let somx2 = ((1.0 - x) * (1.0 + x)).sqrt();
    let mut pmm = 1.0;
    for i in 1..=m {
        pmm *= -((2 * i - 1) as f64) * somx2;
    }

    if l == m {
        return Ok(pmm);
    }

    let mut pmm1 = x * (2 * m + 1) as f64 * pmm;
    if l == m + 1 {
        return Ok(pmm1);
    }

    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = ((2 * ll - 1) as f64 * x * pmm1 - (ll + m - 1) as f64 * pmm) / (ll - m) as f64;
        pmm = pmm1;
        pmm1 = pll;
    }

    Ok(pll)
}

/// Real spherical harmonic Y_lm evaluated at a point on the unit sphere
///
/// Uses the convention Y_{1,-1} ∝ y, Y_{1,0} ∝ z, Y_{1,1} ∝ x, so the
/// combined index L = l² + l + m runs over (s), (y, z, x), (xy, yz, ...).
///
/// # Arguments
///
/// * `l`, `m` - Degree (l >= 0) and order (-l <= m <= l)
/// * `x`, `y`, `z` - Direction; does not need to be normalized
pub fn real_spherical_harmonic(l: i32, m: i32, x: f64, y: f64, z: f64) -> Result<f64> {
    if l < 0 || m.abs() > l {
        return Err(UtilsError::Math(format!(
            "Invalid parameters for spherical harmonic: l={}, m={}",
            l, m
        )));
    }
    let r = (x * x + y * y + z * z).sqrt();
    if r < 1e-300 {
        if l == 0 {
            return Ok(1.0 / (4.0 * PI).sqrt());
        }
        return Ok(0.0);
    }
    let cos_theta = (z / r).clamp(-1.0, 1.0);
    let phi = y.atan2(x);

    let am = m.unsigned_abs();
    let lm = factorial(l as u32 - am).ok_or_else(|| {
        UtilsError::Math("Factorial overflow in spherical harmonic".to_string())
    })? as f64;
    let lp = factorial(l as u32 + am).ok_or_else(|| {
        UtilsError::Math("Factorial overflow in spherical harmonic".to_string())
    })? as f64;
    let norm = ((2 * l + 1) as f64 * lm / (4.0 * PI * lp)).sqrt();
    let p = associated_legendre(l, am as i32, cos_theta)?;
    // (-1)^m cancels the Condon-Shortley phase carried by P_l^m
    let sign = if am % 2 == 1 { -1.0 } else { 1.0 };

    let value = if m == 0 {
        norm * p
    } else if m > 0 {
        std::f64::consts::SQRT_2 * norm * sign * p * (am as f64 * phi).cos()
    } else {
        std::f64::consts::SQRT_2 * norm * sign * p * (am as f64 * phi).sin()
    };
    Ok(value)
}

/// Real spherical harmonic by combined index L = l² + l + m
pub fn real_spherical_harmonic_by_index(big_l: usize, x: f64, y: f64, z: f64) -> Result<f64> {
    let l = (big_l as f64).sqrt() as i32;
    let m = big_l as i32 - l * l - l;
    real_spherical_harmonic(l, m, x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(0), Some(1));
        assert_eq!(factorial(5), Some(120));
        assert_eq!(factorial(20), Some(2432902008176640000));
        assert_eq!(factorial(21), None);
    }

    #[test]
    fn test_double_factorial() {
        assert_eq!(double_factorial(5), Some(15));
        assert_eq!(double_factorial(6), Some(48));
        assert_eq!(double_factorial(9), Some(945));
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(7, 13), 1);
        assert_eq!(gcd(0, 5), 5);
    }

    #[test]
    fn test_erf_values() {
        assert_relative_eq!(erf(0.0), 0.0, epsilon = 1e-15);
        assert_relative_eq!(erf(1.0), 0.8427007929497149, epsilon = 1e-12);
        assert_relative_eq!(erf(-1.0), -0.8427007929497149, epsilon = 1e-12);
        assert_relative_eq!(erf(2.0), 0.9953222650189527, epsilon = 1e-12);
    }

    #[test]
    fn test_erfc_tail_relative_accuracy() {
        // erfc(4) = 1.541725790028002e-8
        assert_relative_eq!(erfc(4.0), 1.541725790028002e-8, max_relative = 1e-10);
        // erfc(5) = 1.5374597944280351e-12
        assert_relative_eq!(erfc(5.0), 1.5374597944280351e-12, max_relative = 1e-10);
    }

    #[test]
    fn test_associated_legendre() {
        assert_relative_eq!(associated_legendre(0, 0, 0.5).unwrap(), 1.0);
        assert_relative_eq!(associated_legendre(1, 0, 0.5).unwrap(), 0.5);
        assert_relative_eq!(
            associated_legendre(1, 1, 0.5).unwrap(),
            -(1.0f64 - 0.25).sqrt(),
            epsilon = 1e-14
        );
        assert_relative_eq!(
            associated_legendre(2, 0, 0.5).unwrap(),
            (3.0 * 0.25 - 1.0) / 2.0,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_real_spherical_harmonics_low_l() {
        let s = 1.0 / (4.0 * PI).sqrt();
        assert_relative_eq!(
            real_spherical_harmonic(0, 0, 0.3, -0.2, 0.9).unwrap(),
            s,
            epsilon = 1e-14
        );

        // l=1 on the coordinate axes: (m=-1, 0, 1) -> (y, z, x)
        let p = (3.0 / (4.0 * PI)).sqrt();
        assert_relative_eq!(
            real_spherical_harmonic(1, -1, 0.0, 1.0, 0.0).unwrap(),
            p,
            epsilon = 1e-14
        );
        assert_relative_eq!(
            real_spherical_harmonic(1, 0, 0.0, 0.0, 1.0).unwrap(),
            p,
            epsilon = 1e-14
        );
        assert_relative_eq!(
            real_spherical_harmonic(1, 1, 1.0, 0.0, 0.0).unwrap(),
            p,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_real_spherical_harmonics_orthonormal() {
        // Numerical check of <Y_L | Y_L'> = delta on a theta-phi product grid
        let nt = 60;
        let np = 120;
        for big_l1 in 0..9usize {
            for big_l2 in big_l1..9usize {
                let mut s = 0.0;
                for it in 0..nt {
                    let theta = PI * (it as f64 + 0.5) / nt as f64;
                    let w = theta.sin() * PI / nt as f64 * 2.0 * PI / np as f64;
                    for ip in 0..np {
                        let phi = 2.0 * PI * ip as f64 / np as f64;
                        let x = theta.sin() * phi.cos();
                        let y = theta.sin() * phi.sin();
                        let z = theta.cos();
                        s += w
                            * real_spherical_harmonic_by_index(big_l1, x, y, z).unwrap()
                            * real_spherical_harmonic_by_index(big_l2, x, y, z).unwrap();
                    }
                }
                let expected = if big_l1 == big_l2 { 1.0 } else { 0.0 };
                assert_relative_eq!(s, expected, epsilon = 1e-6);
            }
        }
    }
}
