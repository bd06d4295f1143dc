use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::core::types::{Number, Point3, Vector3};
use crate::shape::planar::triangle::{TriangleBuilder, TriangleShape};
use crate::shape::planar::TriangleInvalidError;
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{HitData, Intersection, IntersectionList};
use crate::shared::ray::Ray;

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct SmoothTriangleBuilder {
    pub vertices: [Point3; 3],
    /// Surface normals at each of the [Self::vertices], need not be normalised
    pub normals: [Vector3; 3],
}

/// A triangle with a normal at each vertex, interpolated across the face
#[derive(Copy, Clone, Debug, CopyGetters)]
#[get_copy = "pub"]
pub struct SmoothTriangleShape {
    triangle: TriangleShape,
    normals: [Vector3; 3],
}

// region Constructors

impl SmoothTriangleShape {
    pub fn new(vertices: [Point3; 3], normals: [Vector3; 3]) -> Result<Self, TriangleInvalidError> {
        SmoothTriangleBuilder { vertices, normals }.try_into()
    }
}

impl TryFrom<SmoothTriangleBuilder> for SmoothTriangleShape {
    type Error = TriangleInvalidError;

    fn try_from(value: SmoothTriangleBuilder) -> Result<Self, Self::Error> {
        let triangle = TriangleShape::try_from(TriangleBuilder {
            vertices: value.vertices,
        })?;

        let mut normals = [Vector3::ZERO; 3];
        for (index, (out, n)) in normals.iter_mut().zip(value.normals).enumerate() {
            *out = n.try_normalize().ok_or(TriangleInvalidError::ZeroNormal { index })?;
        }

        Ok(Self { triangle, normals })
    }
}

impl TryFrom<SmoothTriangleBuilder> for ShapeInstance {
    type Error = TriangleInvalidError;

    fn try_from(value: SmoothTriangleBuilder) -> Result<Self, Self::Error> {
        SmoothTriangleShape::try_from(value).map(Into::into)
    }
}

// endregion Constructors

// region Shape Impl

impl HasAabb for SmoothTriangleShape {
    fn aabb(&self) -> Option<Aabb> { self.triangle.aabb() }
}

impl Shape for SmoothTriangleShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) { self.triangle.all_intersections(ray, output) }

    fn inside(&self, _point: Point3) -> bool { false }

    fn normal(&self, hit: &Intersection) -> Option<Vector3> {
        // Barycentric weights from the plane coordinates, where `u` runs to vertex 1 and `v` to vertex 2
        let uv = self.triangle.plane().uv(hit.pos_l);
        let weights: [Number; 3] = [1. - uv.x - uv.y, uv.x, uv.y];
        let n = self
            .normals
            .iter()
            .zip(weights)
            .fold(Vector3::ZERO, |acc, (&n, w)| acc + n * w);
        n.try_normalize().or(Some(self.triangle.plane().n()))
    }

    fn is_solid(&self) -> bool { false }
}

// endregion Shape Impl

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normals_are_interpolated() {
        let tri = SmoothTriangleShape::new(
            [Point3::ZERO, Point3::X, Point3::Y],
            [Vector3::Z, Vector3::X + Vector3::Z, Vector3::Z],
        )
        .expect("valid triangle");

        let at = |p: Point3| tri.normal(&Intersection::new_local(1., p, HitData::None)).expect("normal");
        assert_relative_eq!(at(Point3::ZERO), Vector3::Z, epsilon = 1e-12);
        assert_relative_eq!(at(Point3::X), (Vector3::X + Vector3::Z).normalize(), epsilon = 1e-12);
        let mid = at(Point3::new(0.5, 0., 0.));
        assert!(mid.x > 0. && mid.x < at(Point3::X).x);
    }

    #[test]
    fn zero_normal_is_rejected() {
        assert_eq!(
            SmoothTriangleShape::new([Point3::ZERO, Point3::X, Point3::Y], [Vector3::Z, Vector3::ZERO, Vector3::Z]).err(),
            Some(TriangleInvalidError::ZeroNormal { index: 1 })
        );
    }
}
