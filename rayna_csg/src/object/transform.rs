//! Transforms attached to objects
//!
//! # Terminology
//!
//! ## Transform
//! The object's 3D affine transform (see [Transform3]). This maps object-space to world-space; e.g. a
//! [Transform3::from_scale()] with a scale of `Vector3::splat(2.)` makes the object appear twice as large.
//!
//! ## Inverse Transform
//! The inverse of `transform`, mapping world-space to object-space. Rays are mapped with this one.

use getset::CopyGetters;
use thiserror::Error;
use valuable::Valuable;

use crate::core::types::{Point3, Transform3, Vector3};
use crate::shared::math;
use crate::shared::ray::Ray;

/// Smallest absolute determinant we accept for a transform
pub const MIN_DETERMINANT: f64 = 1e-12;

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum TransformError {
    /// The matrix collapses space into fewer than three dimensions, so there is no inverse
    #[error("the transform is singular (determinant {determinant})")]
    Singular { determinant: f64 },
}

/// A struct that holds both a [Transform3] and its inverse
#[derive(Copy, Clone, Debug, PartialEq, CopyGetters)]
#[get_copy = "pub"]
pub struct ObjectTransform {
    transform: Transform3,
    inv_transform: Transform3,
}

impl ObjectTransform {
    pub const IDENTITY: Self = Self {
        transform: Transform3::IDENTITY,
        inv_transform: Transform3::IDENTITY,
    };

    pub fn new(transform: Transform3) -> Result<Self, TransformError> {
        let determinant = transform.matrix3.determinant();
        if !(determinant.abs() > MIN_DETERMINANT) || !transform.is_finite() {
            return Err(TransformError::Singular { determinant });
        }
        Ok(Self {
            transform,
            inv_transform: transform.inverse(),
        })
    }

    pub fn translation(offset: Vector3) -> Self {
        Self {
            transform: Transform3::from_translation(offset),
            inv_transform: Transform3::from_translation(-offset),
        }
    }

    /// A transform that only rotates (or reflects), so it always has an inverse
    pub fn rigid(rotation: Transform3) -> Self {
        Self {
            transform: rotation,
            inv_transform: rotation.inverse(),
        }
    }

    /// Returns the transform that applies `self` first, and then `then`
    pub fn then(&self, then: &Self) -> Self {
        Self {
            transform: then.transform * self.transform,
            inv_transform: self.inv_transform * then.inv_transform,
        }
    }

    /// Maps an incoming world-space ray into object space.
    ///
    /// The direction is not renormalised, so depths along the ray stay the same in both spaces
    pub fn incoming_ray(&self, ray: &Ray) -> Ray {
        Ray::new_unnormalised(
            self.inv_transform.transform_point3(ray.pos()),
            self.inv_transform.transform_vector3(ray.dir()),
        )
    }

    pub fn incoming_point(&self, p: Point3) -> Point3 { self.inv_transform.transform_point3(p) }

    pub fn outgoing_point(&self, p: Point3) -> Point3 { self.transform.transform_point3(p) }

    /// Maps an object-space normal to world space. [None] if it can't be normalised
    pub fn outgoing_normal(&self, n: Vector3) -> Option<Vector3> { math::transform_normal(&self.inv_transform.matrix3, n) }

    pub fn maybe_incoming_ray(transform: &Option<Self>, ray: &Ray) -> Ray {
        match transform {
            None => *ray,
            Some(transform) => transform.incoming_ray(ray),
        }
    }

    pub fn maybe_incoming_point(transform: &Option<Self>, p: Point3) -> Point3 {
        match transform {
            None => p,
            Some(transform) => transform.incoming_point(p),
        }
    }
}

impl TryFrom<Transform3> for ObjectTransform {
    type Error = TransformError;

    fn try_from(value: Transform3) -> Result<Self, Self::Error> { Self::new(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn singular_transform_is_rejected() {
        let flat = Transform3::from_scale(Vector3::new(1., 0., 1.));
        assert!(matches!(ObjectTransform::new(flat), Err(TransformError::Singular { .. })));
    }

    #[test]
    fn composition_matches_matrix_product() {
        let a = Transform3::from_translation(Vector3::new(1., 2., 3.));
        let b = Transform3::from_scale(Vector3::splat(2.));
        let seq = ObjectTransform::new(a)
            .and_then(|t| Ok(t.then(&ObjectTransform::new(b)?)))
            .expect("valid transforms");
        let direct = ObjectTransform::new(b * a).expect("valid transform");
        let p = Point3::new(-1., 0.5, 4.);
        assert_relative_eq!(seq.outgoing_point(p), direct.outgoing_point(p));
        assert_relative_eq!(seq.incoming_point(p), direct.incoming_point(p), epsilon = 1e-12);
    }

    #[test]
    fn depth_is_preserved_through_scaling() {
        let t = ObjectTransform::new(Transform3::from_scale(Vector3::splat(3.))).expect("valid transform");
        let ray = Ray::new([0., 0., -10.], [0., 0., 1.]);
        let local = t.incoming_ray(&ray);
        // World point at depth 7 maps to the local point at the same depth
        assert_relative_eq!(t.incoming_point(ray.at(7.)), local.at(7.));
    }
}
