use crate::core::types::{Matrix3, Number, Transform3, Vector3};

/// Builds a rotation from euler angles in degrees, rotating around `X` first, then `Y`, then `Z`
pub fn rotation_degrees(angles: Vector3) -> Transform3 {
    let rad = angles * (Number::to_radians(1.0));
    Transform3::from_rotation_z(rad.z) * Transform3::from_rotation_y(rad.y) * Transform3::from_rotation_x(rad.x)
}

/// Transforms a surface normal with the given inverse matrix (the inverse-transpose rule).
///
/// Returns [None] if the result can't be normalised
pub fn transform_normal(inv_matrix: &Matrix3, n: Vector3) -> Option<Vector3> {
    (inv_matrix.transpose() * n).try_normalize()
}

/// Returns the index of the largest absolute component, used to pick a projection plane
pub fn dominant_axis(v: Vector3) -> usize {
    let a = v.abs();
    if a.x > a.y {
        if a.x > a.z {
            0
        } else {
            2
        }
    } else if a.y > a.z {
        1
    } else {
        2
    }
}

/// Evaluates a polynomial (highest degree coefficient first) with Horner's method
pub fn horner(coeffs: &[Number], x: Number) -> Number { coeffs.iter().fold(0.0, |acc, &c| acc * x + c) }

/// Evaluates a polynomial and its derivative at the same time
pub fn horner_with_derivative(coeffs: &[Number], x: Number) -> (Number, Number) {
    coeffs
        .iter()
        .fold((0.0, 0.0), |(p, dp), &c| (p * x + c, dp * x + p))
}
