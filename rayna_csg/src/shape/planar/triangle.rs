use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::core::types::{Number, Point3, Vector3};
use crate::shape::planar::{inside_triangle_2d, Planar, TriangleInvalidError, AABB_PADDING};
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{HitData, Intersection, IntersectionList};
use crate::shared::ray::Ray;

/// Intersections closer than this are ignored
pub const DEPTH_TOLERANCE: Number = 1e-6;

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct TriangleBuilder {
    pub vertices: [Point3; 3],
}

/// A flat triangle. It has no interior, so it is never [Shape::inside]
#[derive(Copy, Clone, Debug, CopyGetters)]
pub struct TriangleShape {
    /// The plane that this shape sits upon
    #[get_copy = "pub"]
    plane: Planar,
    #[get_copy = "pub"]
    vertices: [Point3; 3],
    aabb: Aabb,
}

// region Constructors

impl TriangleShape {
    pub fn new(a: impl Into<Point3>, b: impl Into<Point3>, c: impl Into<Point3>) -> Result<Self, TriangleInvalidError> {
        TriangleBuilder {
            vertices: [a.into(), b.into(), c.into()],
        }
        .try_into()
    }
}

impl TryFrom<TriangleBuilder> for TriangleShape {
    type Error = TriangleInvalidError;

    fn try_from(value: TriangleBuilder) -> Result<Self, Self::Error> {
        let [a, b, c] = value.vertices;
        let plane = Planar::from_points(a, b, c)?;
        let aabb = Aabb::encompass_points(value.vertices).min_padded(AABB_PADDING);
        Ok(Self {
            plane,
            vertices: value.vertices,
            aabb,
        })
    }
}

impl TryFrom<TriangleBuilder> for ShapeInstance {
    type Error = TriangleInvalidError;

    fn try_from(value: TriangleBuilder) -> Result<Self, Self::Error> { TriangleShape::try_from(value).map(Into::into) }
}

// endregion Constructors

impl TriangleShape {
    /// Depth of the ray's crossing with the triangle, if it crosses inside the edges
    fn intersect_depth(&self, ray: &Ray) -> Option<Number> {
        let t = self.plane.intersect(ray)?;
        if t <= DEPTH_TOLERANCE {
            return None;
        }
        let p = self.plane.project(ray.at(t));
        inside_triangle_2d(p, self.vertices.map(|v| self.plane.project(v))).then_some(t)
    }
}

// region Shape Impl

impl HasAabb for TriangleShape {
    fn aabb(&self) -> Option<Aabb> { Some(self.aabb) }
}

impl Shape for TriangleShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        if let Some(t) = self.intersect_depth(ray) {
            output.push(Intersection::new_local(t, ray.at(t), HitData::None));
        }
    }

    fn inside(&self, _point: Point3) -> bool { false }

    fn normal(&self, _hit: &Intersection) -> Option<Vector3> { Some(self.plane.n()) }

    fn is_solid(&self) -> bool { false }
}

// endregion Shape Impl
