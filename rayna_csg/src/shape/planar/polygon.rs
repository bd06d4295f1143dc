//! A flat polygon, possibly with several loops and holes
//!
//! Points are given in order around the outline. Every consecutive pair (wrapping from the last point back to the
//! first) forms an edge, and a point is inside if a half-line from it crosses an odd number of edges. Repeating the
//! first point of a loop closes it, which is how several loops (and holes) are described with a single point list.

use std::sync::Arc;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use valuable::Valuable;

use crate::core::targets::SHAPE;
use crate::core::types::{Number, Point2, Point3, Vector3};
use crate::shape::planar::{AABB_PADDING, PARALLEL_EPSILON};
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{HitData, Intersection, IntersectionList};
use crate::shared::ray::Ray;

/// Intersections closer than this are ignored
pub const DEPTH_TOLERANCE: Number = 1e-8;
/// How far a point may be from the plane of the first non-colinear points
pub const COPLANAR_TOLERANCE: Number = 1e-10;

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum PolygonInvalidError {
    #[error("polygon needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },
    #[error("all polygon points are colinear")]
    Colinear,
    #[error("point {index} is {distance} away from the polygon's plane")]
    NotCoplanar { index: usize, distance: Number },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolygonBuilder {
    pub points: Vec<Point3>,
}

/// The shared, immutable part of a polygon
#[derive(Getters, CopyGetters, Debug)]
pub struct PolygonData {
    /// Outline points, in the polygon's own plane frame
    #[get = "pub"]
    outline: Vec<Point2>,
    #[get_copy = "pub"]
    origin: Point3,
    #[get_copy = "pub"]
    u: Vector3,
    #[get_copy = "pub"]
    v: Vector3,
    #[get_copy = "pub"]
    normal: Vector3,
}

#[derive(Clone, Debug, Getters)]
pub struct PolygonShape {
    #[get = "pub"]
    data: Arc<PolygonData>,
    aabb: Aabb,
}

// region Constructors

impl PolygonShape {
    pub fn new(points: impl IntoIterator<Item = impl Into<Point3>>) -> Result<Self, PolygonInvalidError> {
        PolygonBuilder {
            points: points.into_iter().map(Into::into).collect(),
        }
        .try_into()
    }
}

impl TryFrom<PolygonBuilder> for PolygonShape {
    type Error = PolygonInvalidError;

    fn try_from(value: PolygonBuilder) -> Result<Self, Self::Error> {
        let points = value.points;
        if points.len() < 3 {
            return Err(PolygonInvalidError::TooFewPoints { count: points.len() });
        }

        // Frame from the first edge and the first point that isn't on the same line
        let origin = points[0];
        let first_edge = points[1..]
            .iter()
            .map(|&p| p - origin)
            .find(|e| e.length() > PARALLEL_EPSILON)
            .ok_or(PolygonInvalidError::Colinear)?;
        let normal = points
            .iter()
            .find_map(|&p| Vector3::cross(first_edge, p - origin).try_normalize())
            .ok_or(PolygonInvalidError::Colinear)?;
        let u = first_edge.normalize();
        let v = Vector3::cross(normal, u);

        let mut outline = Vec::with_capacity(points.len());
        for (index, &p) in points.iter().enumerate() {
            let rel = p - origin;
            let distance = rel.dot(normal);
            if distance.abs() > COPLANAR_TOLERANCE * rel.length().max(1.) {
                return Err(PolygonInvalidError::NotCoplanar { index, distance });
            }
            outline.push(Point2::new(rel.dot(u), rel.dot(v)));
        }

        debug!(target: SHAPE, points = outline.len(), "built polygon");
        let aabb = Aabb::encompass_points(&points).min_padded(AABB_PADDING);
        Ok(Self {
            data: Arc::new(PolygonData {
                outline,
                origin,
                u,
                v,
                normal,
            }),
            aabb,
        })
    }
}

impl TryFrom<PolygonBuilder> for ShapeInstance {
    type Error = PolygonInvalidError;

    fn try_from(value: PolygonBuilder) -> Result<Self, Self::Error> { PolygonShape::try_from(value).map(Into::into) }
}

// endregion Constructors

impl PolygonData {
    /// Even-odd test of a point in frame coordinates, casting a half-line along `+u`
    pub fn contains(&self, p: Point2) -> bool {
        let n = self.outline.len();
        let mut inside = false;
        for i in 0..n {
            let (a, b) = (self.outline[i], self.outline[(i + 1) % n]);
            // Half-open in `v`, so vertices shared by two edges are only counted once
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if x > p.x {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

// region Shape Impl

impl HasAabb for PolygonShape {
    fn aabb(&self) -> Option<Aabb> { Some(self.aabb) }
}

impl Shape for PolygonShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        let data = &*self.data;
        let denominator = data.normal.dot(ray.dir());
        if denominator.abs() < PARALLEL_EPSILON {
            return;
        }
        let t = (data.origin - ray.pos()).dot(data.normal) / denominator;
        if t <= DEPTH_TOLERANCE {
            return;
        }

        let pos = ray.at(t);
        let rel = pos - data.origin;
        if data.contains(Point2::new(rel.dot(data.u), rel.dot(data.v))) {
            output.push(Intersection::new_local(t, pos, HitData::None));
        }
    }

    fn inside(&self, _point: Point3) -> bool { false }

    fn normal(&self, _hit: &Intersection) -> Option<Vector3> { Some(self.data.normal) }

    fn is_solid(&self) -> bool { false }
}

// endregion Shape Impl
