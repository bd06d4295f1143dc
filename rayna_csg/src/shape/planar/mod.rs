//! This module contains the flat, non-solid shapes (triangles and polygons), and a helper type ([Planar])
//! that they share for the ray-plane part of their intersection test.
//!
//! Planar shapes never enclose a volume: [Shape::inside](crate::shape::Shape::inside) is always `false`, and
//! inside a composite they can only ever contribute surface, never change whether a point is inside.

use getset::CopyGetters;
use thiserror::Error;
use valuable::Valuable;

use crate::core::types::{Number, Point2, Point3, Vector3};
use crate::shared::math;
use crate::shared::ray::Ray;

pub mod polygon;
pub mod smooth_triangle;
pub mod triangle;

/// The recommended amount of padding around AABB's for planar objects
pub const AABB_PADDING: Number = 1e-6;
/// Rays with `|n·d|` below this are treated as parallel to the plane
pub const PARALLEL_EPSILON: Number = 1e-10;
/// Triangles whose doubled area is below this are degenerate
pub const DEGENERATE_AREA: Number = 1e-10;

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum TriangleInvalidError {
    #[error("triangle has (nearly) zero area")]
    Degenerate,
    #[error("vertex normal {index} has zero length")]
    ZeroNormal { index: usize },
}

/// A helper struct for the plane that a triangle sits in
///
/// Stores the plane through `p` spanned by `u` and `v`, so that points on the plane can be
/// expressed as `p + α*u + β*v`.
#[derive(Copy, Clone, Debug, CopyGetters)]
#[get_copy = "pub"]
pub struct Planar {
    p: Point3,
    u: Vector3,
    v: Vector3,
    /// The normal vector for the plane, perpendicular to [Self::u] and [Self::v], and normalised
    n: Vector3,
    /// Part of the plane equation `n·x = d`
    d: Number,
    /// Precalculated vector `n / dot(n, cross(u,v))` (using un-normalised `n`)
    w: Vector3,
    /// Which axis to drop when projecting points onto a 2D plane
    dominant_axis: usize,
}

impl Planar {
    /// Creates a plane from the triangle `a, b, c`, with `p = a`. Fails if the points are colinear
    pub fn from_points(a: Point3, b: Point3, c: Point3) -> Result<Self, TriangleInvalidError> {
        let (u, v) = (b - a, c - a);
        let n_raw = Vector3::cross(u, v);
        if !(n_raw.length() > DEGENERATE_AREA) {
            return Err(TriangleInvalidError::Degenerate);
        }
        let n = n_raw.normalize();
        Ok(Self {
            p: a,
            u,
            v,
            n,
            d: Vector3::dot(n, a),
            // NOTE: using non-normalised normal here
            w: n_raw / n_raw.length_squared(),
            dominant_axis: math::dominant_axis(n),
        })
    }

    /// Depth at which the ray crosses the plane, or [None] if it is (nearly) parallel
    #[inline(always)]
    pub fn intersect(&self, ray: &Ray) -> Option<Number> {
        let denominator = Vector3::dot(self.n, ray.dir());
        if denominator.abs() < PARALLEL_EPSILON {
            return None;
        }
        Some((self.d - Vector3::dot(self.n, ray.pos())) / denominator)
    }

    /// The `(α, β)` coordinates of a point on the plane, so that `point = p + α*u + β*v`
    ///
    /// Since the vectors `u, v` don't have to be orthogonal, this uses the precomputed `w`
    pub fn uv(&self, point: Point3) -> Point2 {
        let rel = point - self.p;
        Point2::new(
            Vector3::dot(self.w, Vector3::cross(rel, self.v)),
            Vector3::dot(self.w, Vector3::cross(self.u, rel)),
        )
    }

    /// Drops the dominant axis of the normal from a point, leaving the two most informative coordinates
    pub fn project(&self, point: Point3) -> Point2 {
        match self.dominant_axis {
            0 => Point2::new(point.y, point.z),
            1 => Point2::new(point.x, point.z),
            _ => Point2::new(point.x, point.y),
        }
    }
}

/// Whether the projected point lies within the projected triangle (edges included)
///
/// Each edge function must have the same sign, whichever way the triangle winds
pub(crate) fn inside_triangle_2d(p: Point2, [a, b, c]: [Point2; 3]) -> bool {
    let edge = |from: Point2, to: Point2| (to - from).perp_dot(p - from);
    let (e0, e1, e2) = (edge(a, b), edge(b, c), edge(c, a));
    (e0 >= 0. && e1 >= 0. && e2 >= 0.) || (e0 <= 0. && e1 <= 0. && e2 <= 0.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uv_of_vertices() {
        let plane = Planar::from_points(
            Point3::new(1., 0., 0.),
            Point3::new(3., 0., 0.),
            Point3::new(1., 4., 0.),
        )
        .expect("valid plane");
        assert_relative_eq!(plane.uv(Point3::new(3., 0., 0.)), Point2::new(1., 0.));
        assert_relative_eq!(plane.uv(Point3::new(1., 2., 0.)), Point2::new(0., 0.5));
        assert_eq!(plane.dominant_axis(), 2);
    }

    #[test]
    fn colinear_points_are_rejected() {
        assert_eq!(
            Planar::from_points(Point3::ZERO, Point3::X, Point3::X * 2.).err(),
            Some(TriangleInvalidError::Degenerate)
        );
    }

    #[test]
    fn edge_test_either_winding() {
        let tri = [Point2::new(0., 0.), Point2::new(1., 0.), Point2::new(0., 1.)];
        let rev = [tri[2], tri[1], tri[0]];
        for t in [tri, rev] {
            assert!(inside_triangle_2d(Point2::new(0.2, 0.2), t));
            assert!(!inside_triangle_2d(Point2::new(0.8, 0.8), t));
        }
    }
}
