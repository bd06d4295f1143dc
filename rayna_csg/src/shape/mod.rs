//! # Module [crate::shape]
//!
//! This module contains the submodules for the different shape types (see [Shape] and [ShapeInstance]).
//!
//! # DEV: Code Structure
//!
//! Shapes (and their corresponding types) are placed into named submodules. Each shape is split into a "Builder"
//! struct, which contains the publicly accessible (and serialisable) properties for the type, and a "Shape" struct
//! which contains the validated, 'built' shape with its cached values. Building is fallible
//! (`TryFrom<Builder> for Shape`), since malformed geometry has to be rejected up front.
//!
//! Shapes work purely in their own local space. Transforms, inversion and identity are handled by the
//! [Object](crate::object::Object) that owns the shape.

use enum_dispatch::enum_dispatch;
use thiserror::Error;

use crate::core::types::{Point3, Vector3};
use crate::csg::{CsgError, CsgShape};
use crate::object::transform::TransformError;
use crate::shared::aabb::HasAabb;
use crate::shared::intersect::{Intersection, IntersectionList};
use crate::shared::ray::Ray;
use crate::shared::RtRequirement;
// noinspection ALL - Used by enum_dispatch macro
#[allow(unused_imports)]
use self::{
    blob::BlobShape,
    lathe::LatheShape,
    planar::{polygon::PolygonShape, smooth_triangle::SmoothTriangleShape, triangle::TriangleShape},
    sphere::SphereShape,
    torus::TorusShape,
};

pub mod blob;
pub mod lathe;
pub mod planar;
pub mod sphere;
pub mod torus;

// region Shape traits

/// The capabilities every shape provides, in its own local space
#[enum_dispatch]
pub trait Shape: HasAabb + RtRequirement {
    /// Finds every crossing of the ray with the shape's surface, appending them to `output`
    ///
    /// # Requirements
    /// - Only depths greater than the shape's self-intersection tolerance are reported
    /// - The appended intersections must be sorted by ascending depth
    /// - The ray direction is not necessarily normalised; depths are in units of the ray's direction
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList);

    /// Whether the point is in the interior of the shape
    fn inside(&self, point: Point3) -> bool;

    /// The outward unit normal at an intersection previously produced by this shape.
    ///
    /// Returns [None] if the normal is degenerate at that point
    fn normal(&self, hit: &Intersection) -> Option<Vector3>;

    /// Whether the shape encloses a volume. Non-solid shapes (triangles, polygons) are never inside
    fn is_solid(&self) -> bool { true }
}

/// An optimised implementation of [Shape], using static dispatch
#[enum_dispatch(Shape, HasAabb)]
#[derive(Clone, Debug)]
pub enum ShapeInstance {
    SphereShape,
    TorusShape,
    BlobShape,
    LatheShape,
    TriangleShape,
    SmoothTriangleShape,
    PolygonShape,
    CsgShape,
}

// endregion Shape traits

// region Errors

/// Any error that can occur while building an object graph
#[derive(Error, Clone, Debug)]
pub enum ShapeError {
    #[error("invalid sphere: {0}")]
    Sphere(#[from] sphere::SphereInvalidError),
    #[error("invalid torus: {0}")]
    Torus(#[from] torus::TorusInvalidError),
    #[error("invalid blob: {0}")]
    Blob(#[from] blob::BlobInvalidError),
    #[error("invalid lathe: {0}")]
    Lathe(#[from] lathe::LatheInvalidError),
    #[error("invalid triangle: {0}")]
    Triangle(#[from] planar::TriangleInvalidError),
    #[error("invalid polygon: {0}")]
    Polygon(#[from] planar::polygon::PolygonInvalidError),
    #[error("invalid transform: {0}")]
    Transform(#[from] TransformError),
    #[error("invalid csg composite: {0}")]
    Csg(#[from] CsgError),
}

// endregion Errors
