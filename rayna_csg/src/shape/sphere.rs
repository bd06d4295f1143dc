use getset::CopyGetters;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use valuable::Valuable;

use crate::core::types::{Number, Point3, Vector3};
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{HitData, Intersection, IntersectionList};
use crate::shared::ray::Ray;

/// Intersections closer than this are ignored, to avoid self-intersection
pub const DEPTH_TOLERANCE: Number = 1e-6;

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum SphereInvalidError {
    #[error("radius must be positive and finite, got {radius}")]
    Radius { radius: Number },
}

/// A builder struct used to create a sphere
///
/// Call [TryInto::try_into] or [SphereShape::try_from] to create the actual sphere shape
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct SphereBuilder {
    pub centre: Point3,
    pub radius: Number,
}

/// A validated sphere, with precomputed values
#[derive(Copy, Clone, Debug, CopyGetters)]
pub struct SphereShape {
    #[get_copy = "pub"]
    centre: Point3,
    #[get_copy = "pub"]
    radius: Number,
    #[get_copy = "pub"]
    radius_sqr: Number,
    aabb: Aabb,
}

// region Constructors

impl SphereShape {
    pub fn new(centre: impl Into<Point3>, radius: Number) -> Result<Self, SphereInvalidError> {
        SphereBuilder {
            centre: centre.into(),
            radius,
        }
        .try_into()
    }
}

impl TryFrom<SphereBuilder> for SphereShape {
    type Error = SphereInvalidError;

    fn try_from(value: SphereBuilder) -> Result<Self, Self::Error> {
        let SphereBuilder { centre, radius } = value;
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SphereInvalidError::Radius { radius });
        }
        Ok(Self {
            centre,
            radius,
            radius_sqr: radius * radius,
            aabb: Aabb::new(centre - Vector3::splat(radius), centre + Vector3::splat(radius)),
        })
    }
}

impl TryFrom<SphereBuilder> for ShapeInstance {
    type Error = SphereInvalidError;

    fn try_from(value: SphereBuilder) -> Result<Self, Self::Error> { SphereShape::try_from(value).map(Into::into) }
}

// endregion Constructors

// region Shape Impl

impl HasAabb for SphereShape {
    fn aabb(&self) -> Option<Aabb> { Some(self.aabb) }
}

impl Shape for SphereShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        let rel = ray.pos() - self.centre;

        // Quadratic formula variables
        let a = ray.dir().length_squared();
        let half_b = Vector3::dot(rel, ray.dir());
        let c = rel.length_squared() - self.radius_sqr;
        let discriminant = (half_b * half_b) - (a * c);

        // No solutions, the ray misses (tangent rays count as a miss)
        if discriminant <= 0. || a.is_zero() {
            return;
        }

        let sqrt_d = discriminant.sqrt();
        for t in [(-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a] {
            if t > DEPTH_TOLERANCE {
                output.push(Intersection::new_local(t, ray.at(t), HitData::None));
            }
        }
    }

    fn inside(&self, point: Point3) -> bool { (point - self.centre).length_squared() < self.radius_sqr }

    fn normal(&self, hit: &Intersection) -> Option<Vector3> { (hit.pos_l - self.centre).try_normalize() }
}

// endregion Shape Impl
