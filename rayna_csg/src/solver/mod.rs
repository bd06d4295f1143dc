//! # Module [crate::solver]
//!
//! Real root finding for the polynomials produced by ray-surface intersection tests.
//!
//! Coefficient slices are always ordered **highest degree first**, so `[a, b, c]` is `a*x^2 + b*x + c`.
//!
//! Low degree polynomials are solved in closed form ([closed_form]). Anything above a quartic, or any polynomial
//! when the caller asks for it, goes through Sturm sequences ([sturm]), which only look for roots in
//! `(0, MAX_DISTANCE]`.

use smallvec::SmallVec;
use tracing::trace;

use crate::core::targets::SOLVER;
use crate::core::types::Number;

pub mod closed_form;
pub mod poly;
pub mod sturm;

/// The roots of a polynomial. Enough inline space for a degree-6 lathe segment
pub type Roots = SmallVec<[Number; 8]>;

/// Leading coefficients smaller than this are treated as zero
pub const SMALL_ENOUGH: Number = 1e-10;
/// Largest distance that Sturm root isolation will search up to
pub const MAX_DISTANCE: Number = 1e7;
/// Coefficient magnitude spreads above this make the closed-form quartic unreliable
pub const DIFFICULT_COEFF_RATIO: Number = 1e12;

/// Finds the real roots of the polynomial `coeffs`
///
/// # Arguments
/// * `coeffs`: The coefficients, highest degree first
/// * `use_sturm`: Forces Sturm sequences even where a closed form exists (more robust, slower)
/// * `epsilon`: If the constant term is this small relative to the linear term, the (near) zero root is dropped and
///   the degree is lowered by one. Pass `0.0` to disable
///
/// # Return Value
/// The roots are not sorted. Roots found through Sturm sequences are restricted to `(0, MAX_DISTANCE]`,
/// so callers must apply their own range checks either way.
pub fn solve_polynomial(coeffs: &[Number], use_sturm: bool, epsilon: Number) -> Roots {
    // Strip leading (near) zeros, lowering the degree
    let first = coeffs.iter().position(|c| c.abs() >= SMALL_ENOUGH);
    let Some(first) = first else {
        return Roots::new();
    };
    let mut coeffs = &coeffs[first..];

    // A tiny constant term means a root right at zero, which callers will discard anyway
    if epsilon > 0.0 && coeffs.len() > 2 {
        let n = coeffs.len();
        if coeffs[n - 2] != 0.0 && (coeffs[n - 1] / coeffs[n - 2]).abs() < epsilon {
            coeffs = &coeffs[..n - 1];
        }
    }

    match coeffs.len() {
        0 | 1 => Roots::new(),
        2 => closed_form::solve_linear(coeffs[0], coeffs[1]).into_iter().collect(),
        3 if !use_sturm => closed_form::solve_quadratic(coeffs[0], coeffs[1], coeffs[2]),
        4 if !use_sturm => closed_form::solve_cubic(coeffs[0], coeffs[1], coeffs[2], coeffs[3]),
        5 if !use_sturm && !difficult_coeffs(coeffs) => {
            closed_form::solve_quartic(coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4])
        }
        _ => {
            if !use_sturm {
                trace!(target: SOLVER, degree = coeffs.len() - 1, "falling back to sturm sequences");
            }
            sturm::polysolve(coeffs)
        }
    }
}

/// Whether the coefficients span so many orders of magnitude that a closed form would lose all precision
fn difficult_coeffs(coeffs: &[Number]) -> bool {
    let (min, max) = coeffs
        .iter()
        .map(|c| c.abs())
        .filter(|&c| c > 0.0)
        .fold((Number::INFINITY, 0.0 as Number), |(lo, hi), c| (lo.min(c), hi.max(c)));
    max > 0.0 && max / min > DIFFICULT_COEFF_RATIO
}
