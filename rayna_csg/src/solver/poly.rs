//! Small arithmetic helpers for building up polynomials before they get solved
//!
//! Same convention as the rest of [crate::solver]: highest degree first.

use smallvec::SmallVec;

use crate::core::types::Number;

/// Coefficients of a polynomial, highest degree first
pub type Poly = SmallVec<[Number; 8]>;

/// Product of two polynomials
pub fn multiply(a: &[Number], b: &[Number]) -> Poly {
    if a.is_empty() || b.is_empty() {
        return Poly::new();
    }
    let mut out: Poly = SmallVec::from_elem(0.0, a.len() + b.len() - 1);
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Sum of two polynomials of possibly different degrees (aligned at the constant term)
pub fn add(a: &[Number], b: &[Number]) -> Poly {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let offset = long.len() - short.len();
    let mut out = Poly::from_slice(long);
    for (o, s) in out[offset..].iter_mut().zip(short) {
        *o += s;
    }
    out
}

/// Multiplies every coefficient by `k`
pub fn scale(a: &[Number], k: Number) -> Poly { a.iter().map(|c| c * k).collect() }

/// The derivative of the polynomial
pub fn derivative(a: &[Number]) -> Poly {
    let n = a.len();
    a.iter()
        .take(n.saturating_sub(1))
        .enumerate()
        .map(|(i, c)| c * (n - 1 - i) as Number)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_and_add() {
        // (x + 1)(x - 1) = x^2 - 1
        assert_eq!(multiply(&[1., 1.], &[1., -1.]).as_slice(), &[1., 0., -1.]);
        // (x^2 - 1) + (2x + 3) = x^2 + 2x + 2
        assert_eq!(add(&[1., 0., -1.], &[2., 3.]).as_slice(), &[1., 2., 2.]);
        assert_eq!(scale(&[1., -2.], 3.).as_slice(), &[3., -6.]);
        assert_eq!(derivative(&[1., 2., 3., 4.]).as_slice(), &[3., 4., 3.]);
    }
}
