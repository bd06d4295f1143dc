//! A torus lying in the local `XY` plane, centred on the origin, with its axis of symmetry along `Z`
//!
//! The surface is the quartic `(x²+y²+z²+R²−r²)² = 4R²(x²+y²)`

use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;
use valuable::Valuable;

use crate::core::targets::SHAPE;
use crate::core::types::{Number, Point3, Vector3};
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{sort_by_dist, HitData, Intersection, IntersectionList};
use crate::shared::ray::Ray;
use crate::solver::{self, MAX_DISTANCE};

/// Intersections closer than this are ignored. Quartic roots are noisy, so this is larger than for quadrics
pub const DEPTH_TOLERANCE: Number = 1e-4;

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum TorusInvalidError {
    #[error("major radius must be positive and finite, got {major}")]
    MajorRadius { major: Number },
    #[error("minor radius must be positive and finite, got {minor}")]
    MinorRadius { minor: Number },
    #[error("minor radius {minor} must be smaller than major radius {major}")]
    SelfIntersecting { major: Number, minor: Number },
}

/// A builder struct used to create a torus
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct TorusBuilder {
    /// Distance from the centre of the torus to the centre of the tube
    pub major_radius: Number,
    /// Radius of the tube
    pub minor_radius: Number,
    /// Whether to solve the quartic with Sturm sequences instead of the closed form
    pub sturm: bool,
}

impl TorusBuilder {
    pub fn new(major_radius: Number, minor_radius: Number) -> Self {
        Self {
            major_radius,
            minor_radius,
            sturm: true,
        }
    }
}

#[derive(Copy, Clone, Debug, CopyGetters)]
pub struct TorusShape {
    #[get_copy = "pub"]
    major_radius: Number,
    #[get_copy = "pub"]
    minor_radius: Number,
    #[get_copy = "pub"]
    sturm: bool,
    aabb: Aabb,
}

// region Constructors

impl TorusShape {
    pub fn new(major_radius: Number, minor_radius: Number) -> Result<Self, TorusInvalidError> {
        TorusBuilder::new(major_radius, minor_radius).try_into()
    }
}

impl TryFrom<TorusBuilder> for TorusShape {
    type Error = TorusInvalidError;

    fn try_from(value: TorusBuilder) -> Result<Self, Self::Error> {
        let TorusBuilder {
            major_radius: major,
            minor_radius: minor,
            sturm,
        } = value;

        if !(major > 0. && major.is_finite()) {
            return Err(TorusInvalidError::MajorRadius { major });
        }
        if !(minor > 0. && minor.is_finite()) {
            return Err(TorusInvalidError::MinorRadius { minor });
        }
        if minor >= major {
            return Err(TorusInvalidError::SelfIntersecting { major, minor });
        }

        let outer = major + minor;
        Ok(Self {
            major_radius: major,
            minor_radius: minor,
            sturm,
            aabb: Aabb::new([-outer, -outer, -minor], [outer, outer, minor]),
        })
    }
}

impl TryFrom<TorusBuilder> for ShapeInstance {
    type Error = TorusInvalidError;

    fn try_from(value: TorusBuilder) -> Result<Self, Self::Error> { TorusShape::try_from(value).map(Into::into) }
}

// endregion Constructors

// region Shape Impl

impl TorusShape {
    /// Depths (along a unit direction) where the ray enters and leaves the bounding sphere
    fn bounding_sphere_span(&self, pos: Point3, dir: Vector3) -> Option<(Number, Number)> {
        let outer = self.major_radius + self.minor_radius;
        let half_b = pos.dot(dir);
        let c = pos.length_squared() - outer * outer;
        let discriminant = half_b * half_b - c;
        if discriminant <= 0. {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        Some((-half_b - sqrt_d, -half_b + sqrt_d))
    }

    /// The quartic in `s` for a ray starting at `p` with the unit direction `d`
    fn coefficients(&self, p: Point3, d: Vector3) -> [Number; 5] {
        let r2 = self.major_radius * self.major_radius;
        let k1 = p.length_squared() - r2 - self.minor_radius * self.minor_radius;
        let k2 = p.dot(d);

        [
            1.,
            4. * k2,
            2. * (k1 + 2. * (k2 * k2 + r2 * d.z * d.z)),
            4. * (k2 * k1 + 2. * r2 * p.z * d.z),
            k1 * k1 + 4. * r2 * (p.z * p.z - self.minor_radius * self.minor_radius),
        ]
    }
}

impl HasAabb for TorusShape {
    fn aabb(&self) -> Option<Aabb> { Some(self.aabb) }
}

impl Shape for TorusShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        // Work with a unit direction, so the coefficients stay well scaled
        let len = ray.dir().length();
        let Some(dir) = ray.dir().try_normalize() else {
            return;
        };

        let Some((entry, exit)) = self.bounding_sphere_span(ray.pos(), dir) else {
            return;
        };
        if exit <= 0. {
            return;
        }

        // Move the ray start up to the bounding sphere, keeping the roots small. Stopping one tube radius short
        // keeps every root strictly positive, as Sturm isolation only looks at `(0, MAX_DISTANCE]`
        let shift = (entry - self.minor_radius).max(0.);
        let pos = ray.pos() + dir * shift;

        let roots = solver::solve_polynomial(&self.coefficients(pos, dir), self.sturm, 0.);

        let start = output.len();
        for s in roots {
            let t = (s + shift) / len;
            if !(t > DEPTH_TOLERANCE && t < MAX_DISTANCE) {
                trace!(target: SHAPE, t, "torus root out of range");
                continue;
            }
            output.push(Intersection::new_local(t, ray.at(t), HitData::None));
        }
        sort_by_dist(&mut output[start..]);
    }

    fn inside(&self, point: Point3) -> bool {
        let ring = point.truncate().length() - self.major_radius;
        ring * ring + point.z * point.z <= self.minor_radius * self.minor_radius
    }

    fn normal(&self, hit: &Intersection) -> Option<Vector3> {
        let p = hit.pos_l;
        let ring_dir = Vector3::new(p.x, p.y, 0.).try_normalize()?;
        (p - ring_dir * self.major_radius).try_normalize()
    }
}

// endregion Shape Impl

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn depths(shape: &TorusShape, ray: Ray) -> Vec<Number> {
        let mut out = IntersectionList::new();
        shape.all_intersections(&ray, &mut out);
        out.iter().map(|i| i.dist).collect()
    }

    #[test]
    fn ray_through_hole_misses() {
        let torus = TorusShape::new(2., 0.5).expect("valid torus");
        assert!(depths(&torus, Ray::new([0., 0., 5.], [0., 0., -1.])).is_empty());
    }

    #[test]
    fn ray_in_plane_crosses_four_times() {
        for sturm in [true, false] {
            let torus = TorusShape::try_from(TorusBuilder {
                sturm,
                ..TorusBuilder::new(2., 0.5)
            })
            .expect("valid torus");
            let d = depths(&torus, Ray::new([-5., 0., 0.], [1., 0., 0.]));
            assert_eq!(d.len(), 4, "sturm: {sturm}");
            for (got, expected) in d.iter().zip([2.5, 3.5, 6.5, 7.5]) {
                assert_relative_eq!(*got, expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn scaled_ray_direction_keeps_depths() {
        let torus = TorusShape::new(2., 0.5).expect("valid torus");
        let d = depths(&torus, Ray::new_unnormalised([-5., 0., 0.], [2., 0., 0.]));
        assert_eq!(d.len(), 4);
        assert_relative_eq!(d[0], 1.25, epsilon = 1e-6);
    }

    #[test]
    fn inside_and_normal() {
        let torus = TorusShape::new(2., 0.5).expect("valid torus");
        assert!(torus.inside(Point3::new(2., 0., 0.)));
        assert!(!torus.inside(Point3::ZERO));
        let hit = Intersection::new_local(0., Point3::new(2.5, 0., 0.), HitData::None);
        assert_relative_eq!(torus.normal(&hit).expect("normal"), Vector3::X);
    }

    #[test]
    fn invalid_radii() {
        assert!(matches!(
            TorusShape::new(1., 2.),
            Err(TorusInvalidError::SelfIntersecting { .. })
        ));
        assert!(TorusShape::new(-1., 0.5).is_err());
        assert!(TorusShape::new(1., 0.).is_err());
    }
}
