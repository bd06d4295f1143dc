//! Root isolation with Sturm sequences
//!
//! The Sturm sequence of `p` is `p, p', -rem(p, p'), ...`. The number of sign changes in the sequence evaluated at
//! `x`, minus the number at `y`, is the number of distinct real roots in `(x, y]`. That lets us bisect until each
//! interval holds exactly one root, which is then refined by regula falsi.

use smallvec::SmallVec;
use tracing::trace;

use crate::core::targets::SOLVER;
use crate::core::types::Number;
use crate::shared::math::horner;
use crate::solver::poly::{self, Poly};
use crate::solver::{Roots, MAX_DISTANCE};

/// Iteration cap for both bisection and regula falsi
pub const MAX_ITERATIONS: usize = 50;
/// Relative precision that regula falsi stops at
pub const REL_ERROR: Number = 1e-12;
/// Remainder coefficients below this (relative to the largest one) are treated as zero
const REMAINDER_TOLERANCE: Number = 1e-14;
/// How tight the bracket must be to accept a root when regula falsi runs out of iterations
const CONVERGENCE_FALLBACK: Number = 1e-6;

type Sequence = SmallVec<[Poly; 8]>;

/// Finds every distinct real root of `coeffs` in `(0, MAX_DISTANCE]`
pub fn polysolve(coeffs: &[Number]) -> Roots {
    let mut roots = Roots::new();
    if coeffs.len() < 2 {
        return roots;
    }

    let seq = build_sequence(coeffs);
    let at_min = sign_changes(&seq, 0.0);
    let at_max = sign_changes(&seq, MAX_DISTANCE);
    if at_min <= at_max {
        return roots;
    }

    bisect(&seq, 0.0, MAX_DISTANCE, at_min, at_max, 0, &mut roots);
    roots
}

/// Builds the Sturm sequence for the polynomial
fn build_sequence(coeffs: &[Number]) -> Sequence {
    let mut seq = Sequence::new();
    let p: Poly = normalised(coeffs.iter().copied().collect());
    let dp: Poly = normalised(poly::derivative(&p));
    seq.push(p);
    seq.push(dp);

    while seq.last().map_or(false, |last| last.len() > 1) {
        let n = seq.len();
        let mut rem = remainder(&seq[n - 2], &seq[n - 1]);
        rem.iter_mut().for_each(|c| *c = -*c);
        if rem.is_empty() {
            // `p` had a repeated root, the sequence ends at the gcd
            break;
        }
        seq.push(normalised(rem));
    }

    seq
}

/// Scales the polynomial so that the leading coefficient has magnitude one (keeping the sign)
fn normalised(mut p: Poly) -> Poly {
    if let Some(&lead) = p.first() {
        let scale = lead.abs();
        if scale > 0.0 {
            p.iter_mut().for_each(|c| *c /= scale);
        }
    }
    p
}

/// Remainder of the polynomial division `num / den`, with negligible leading terms removed
fn remainder(num: &[Number], den: &[Number]) -> Poly {
    let mut rem: Poly = num.iter().copied().collect();
    if den.is_empty() || den.len() > rem.len() {
        return rem;
    }

    let lead = den[0];
    for i in 0..=(rem.len() - den.len()) {
        let factor = rem[i] / lead;
        for (j, d) in den.iter().enumerate() {
            rem[i + j] -= factor * d;
        }
    }

    let rem_len = den.len() - 1;
    let mut rem: Poly = rem[rem.len() - rem_len..].iter().copied().collect();
    let biggest = num.iter().fold(0.0 as Number, |m, c| m.max(c.abs()));
    while rem.first().map_or(false, |c| c.abs() <= REMAINDER_TOLERANCE * biggest.max(1.0)) {
        rem.remove(0);
    }
    rem
}

/// Number of sign changes of the sequence evaluated at `x`, ignoring zeros
fn sign_changes(seq: &[Poly], x: Number) -> usize {
    let mut changes = 0;
    let mut last_sign = 0.0;
    for p in seq {
        let v = horner(p, x);
        if v == 0.0 {
            continue;
        }
        let sign = v.signum();
        if last_sign != 0.0 && sign != last_sign {
            changes += 1;
        }
        last_sign = sign;
    }
    changes
}

/// Recursively splits `(min, max]` until each piece contains a single root
fn bisect(
    seq: &[Poly],
    min: Number,
    max: Number,
    at_min: usize,
    at_max: usize,
    depth: usize,
    roots: &mut Roots,
) {
    let count = at_min.saturating_sub(at_max);
    if count == 0 {
        return;
    }

    if count == 1 {
        match refine(&seq[0], seq, min, max, at_min) {
            Some(root) => roots.push(root),
            None => trace!(target: SOLVER, min, max, "root refinement did not converge"),
        }
        return;
    }

    let mid = (min + max) / 2.0;
    if depth >= MAX_ITERATIONS || (max - min) <= REL_ERROR * max.abs().max(1.0) {
        // Roots too close to tell apart, report them as one
        roots.push(mid);
        return;
    }

    let at_mid = sign_changes(seq, mid);
    bisect(seq, min, mid, at_min, at_mid, depth + 1, roots);
    bisect(seq, mid, max, at_mid, at_max, depth + 1, roots);
}

/// Refines the single root of `p` in `(min, max]`
///
/// Uses the Illinois variant of regula falsi when the end points bracket a sign change, and otherwise keeps
/// bisecting with the Sturm counts (the root has even multiplicity, so `p` doesn't change sign across it)
fn refine(p: &[Number], seq: &[Poly], mut min: Number, mut max: Number, at_min: usize) -> Option<Number> {
    let mut f_min = horner(p, min);
    let mut f_max = horner(p, max);

    if f_max == 0.0 {
        return Some(max);
    }

    if f_min * f_max < 0.0 {
        // Regula falsi crawls on huge brackets, so halve it down to a sensible size first
        while max - min > min.abs().max(1.0) {
            let mid = (min + max) / 2.0;
            let f_mid = horner(p, mid);
            if f_mid == 0.0 {
                return Some(mid);
            }
            if f_min * f_mid < 0.0 {
                max = mid;
                f_max = f_mid;
            } else {
                min = mid;
                f_min = f_mid;
            }
        }

        let mut side = 0i8;
        for _ in 0..MAX_ITERATIONS {
            let x = (f_max * min - f_min * max) / (f_max - f_min);
            let fx = horner(p, x);
            if fx == 0.0 || (max - min).abs() <= REL_ERROR * x.abs() {
                return Some(x);
            }
            if fx * f_max > 0.0 {
                max = x;
                f_max = fx;
                if side == -1 {
                    f_min /= 2.0;
                }
                side = -1;
            } else {
                min = x;
                f_min = fx;
                if side == 1 {
                    f_max /= 2.0;
                }
                side = 1;
            }
        }
        let x = (min + max) / 2.0;
        return ((max - min).abs() <= CONVERGENCE_FALLBACK * x.abs().max(1.0)).then_some(x);
    }

    // No sign change: narrow down with the Sturm counts instead
    for _ in 0..MAX_ITERATIONS * 2 {
        let mid = (min + max) / 2.0;
        if (max - min) <= REL_ERROR * mid.abs().max(1.0) {
            return Some(mid);
        }
        if sign_changes(seq, mid) < at_min {
            max = mid;
        } else {
            min = mid;
        }
    }
    Some((min + max) / 2.0)
}
