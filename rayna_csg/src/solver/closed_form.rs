//! Closed-form solvers for polynomials up to degree four
//!
//! All of these return every real root, without any range restrictions

use std::f64::consts::TAU;

use crate::core::types::Number;
use crate::shared::math::horner_with_derivative;
use crate::solver::{Roots, SMALL_ENOUGH};

/// Number of Newton steps used to polish quartic roots
const POLISH_STEPS: usize = 2;

pub fn solve_linear(a: Number, b: Number) -> Option<Number> { (a != 0.0).then(|| -b / a) }

/// Solves `a*x^2 + b*x + c = 0`
///
/// A discriminant within [SMALL_ENOUGH] of zero is treated as a single (double) root
pub fn solve_quadratic(a: Number, b: Number, c: Number) -> Roots {
    let mut roots = Roots::new();
    if a == 0.0 {
        roots.extend(solve_linear(b, c));
        return roots;
    }

    let d = b * b - 4.0 * a * c;
    if d < -SMALL_ENOUGH {
        return roots;
    }
    if d <= SMALL_ENOUGH {
        roots.push(-b / (2.0 * a));
        return roots;
    }

    // Avoids cancellation between `-b` and `sqrt(d)`
    let q = -0.5 * (b + b.signum() * d.sqrt());
    roots.push(q / a);
    if q != 0.0 {
        roots.push(c / q);
    } else {
        roots.push(-q / a);
    }
    roots
}

/// Solves `a*x^3 + b*x^2 + c*x + d = 0`
///
/// Uses the trigonometric form when there are three real roots, and Cardano's formula otherwise
pub fn solve_cubic(a: Number, b: Number, c: Number, d: Number) -> Roots {
    if a == 0.0 {
        return solve_quadratic(b, c, d);
    }

    let (a1, a2, a3) = (b / a, c / a, d / a);
    let q = (a1 * a1 - 3.0 * a2) / 9.0;
    let r = (2.0 * a1 * a1 * a1 - 9.0 * a1 * a2 + 27.0 * a3) / 54.0;
    let q3 = q * q * q;
    let shift = a1 / 3.0;

    let mut roots = Roots::new();
    if r * r < q3 {
        let theta = Number::acos((r / q3.sqrt()).clamp(-1.0, 1.0));
        let k = -2.0 * q.sqrt();
        roots.extend((0..3).map(|i| k * Number::cos((theta + TAU * i as Number) / 3.0) - shift));
    } else {
        let big_a = -r.signum() * (r.abs() + (r * r - q3).sqrt()).cbrt();
        let big_b = if big_a != 0.0 { q / big_a } else { 0.0 };
        roots.push(big_a + big_b - shift);
    }
    roots
}

/// Solves `a*x^4 + b*x^3 + c*x^2 + d*x + e = 0` with Ferrari's method
///
/// The resolvent cubic gives the value that turns the depressed quartic into a difference of two squares,
/// which then splits into two quadratics. Roots are polished with a couple of Newton steps afterwards,
/// since the closed form loses a few digits.
pub fn solve_quartic(a: Number, b: Number, c: Number, d: Number, e: Number) -> Roots {
    if a == 0.0 {
        return solve_cubic(b, c, d, e);
    }

    let (a1, a2, a3, a4) = (b / a, c / a, d / a, e / a);

    // Depressed quartic `y^4 + p*y^2 + q*y + r`, with `x = y - a1/4`
    let a1_sq = a1 * a1;
    let p = a2 - 3.0 * a1_sq / 8.0;
    let q = a3 - a1 * a2 / 2.0 + a1_sq * a1 / 8.0;
    let r = a4 - a1 * a3 / 4.0 + a1_sq * a2 / 16.0 - 3.0 * a1_sq * a1_sq / 256.0;
    let shift = a1 / 4.0;

    let mut depressed = Roots::new();
    if q.abs() < SMALL_ENOUGH {
        // Biquadratic: solve for `y^2`
        for z in solve_quadratic(1.0, p, r) {
            if z >= 0.0 {
                let s = z.sqrt();
                depressed.push(s);
                depressed.push(-s);
            }
        }
    } else {
        // Resolvent cubic `m^3 + p*m^2 + (p^2/4 - r)*m - q^2/8 = 0`, always has a positive root when `q != 0`
        let m = solve_cubic(1.0, p, p * p / 4.0 - r, -q * q / 8.0)
            .into_iter()
            .fold(Number::NEG_INFINITY, Number::max);
        if !(m > 0.0) {
            return Roots::new();
        }
        let s = (2.0 * m).sqrt();
        let half_p_m = p / 2.0 + m;
        let q_s = q / (2.0 * s);
        depressed.extend(solve_quadratic(1.0, -s, half_p_m + q_s));
        depressed.extend(solve_quadratic(1.0, s, half_p_m - q_s));
    }

    let coeffs = [1.0, a1, a2, a3, a4];
    depressed
        .into_iter()
        .map(|y| polish(&coeffs, y - shift))
        .collect()
}

/// Refines a root estimate with a few Newton steps, keeping the estimate if a step goes wrong
fn polish(coeffs: &[Number], mut x: Number) -> Number {
    for _ in 0..POLISH_STEPS {
        let (p, dp) = horner_with_derivative(coeffs, x);
        if dp == 0.0 {
            break;
        }
        let next = x - p / dp;
        if !next.is_finite() {
            break;
        }
        x = next;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sorted(mut r: Roots) -> Vec<Number> {
        r.sort_by(Number::total_cmp);
        r.into_vec()
    }

    #[test]
    fn quadratic_cases() {
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
        assert_eq!(sorted(solve_quadratic(1.0, -2.0, 1.0)), vec![1.0]);
        let r = sorted(solve_quadratic(1.0, -3.0, 2.0));
        assert_relative_eq!(r[0], 1.0);
        assert_relative_eq!(r[1], 2.0);
    }

    #[test]
    fn cubic_three_and_one_roots() {
        // (x+1)(x-2)(x-5) = x^3 - 6x^2 + 3x + 10
        let r = sorted(solve_cubic(1.0, -6.0, 3.0, 10.0));
        assert_eq!(r.len(), 3);
        for (a, b) in r.iter().zip([-1.0, 2.0, 5.0]) {
            assert_relative_eq!(*a, b, epsilon = 1e-9);
        }
        // x^3 + x - 2 = (x-1)(x^2+x+2)
        let r = sorted(solve_cubic(1.0, 0.0, 1.0, -2.0));
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn biquadratic_quartic() {
        // (x^2-1)(x^2-4)
        let r = sorted(solve_quartic(1.0, 0.0, -5.0, 0.0, 4.0));
        assert_eq!(r.len(), 4);
        for (a, b) in r.iter().zip([-2.0, -1.0, 1.0, 2.0]) {
            assert_relative_eq!(*a, b, epsilon = 1e-9);
        }
    }
}
