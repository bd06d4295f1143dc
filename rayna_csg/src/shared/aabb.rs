use std::borrow::Borrow;

use enum_dispatch::enum_dispatch;
use getset::*;

use crate::core::types::{Number, Point3, Transform3, Vector3};
use crate::shared::interval::Interval;
use crate::shared::ray::Ray;

/// An **Axis-Aligned Bounding Box** (AABB)
///
/// The box spans between the two corners `min` and `max`
#[derive(CopyGetters, Copy, Clone, Debug, PartialEq, Default)]
#[getset(get_copy = "pub")]
pub struct Aabb {
    /// The lower corner of the [Aabb]; the corner with the smallest coordinates
    min: Point3,
    /// The upper corner of the [Aabb]; the corner with the largest coordinates
    max: Point3,
    /// The difference between [min](fn@Self::min) and [max](fn@Self::max); how large the [Aabb] is
    size: Vector3,
}

// region Constructors

impl Aabb {
    /// Creates a new [Aabb] from two points, which do *not* have to be sorted by min/max
    pub fn new(a: impl Into<Point3>, b: impl Into<Point3>) -> Self {
        let (a, b) = (a.into(), b.into());
        let min = Point3::min(a, b);
        let max = Point3::max(a, b);
        Self {
            min,
            max,
            size: max - min,
        }
    }

    pub fn new_centred(centre: impl Into<Point3>, size: impl Into<Vector3>) -> Self {
        let (centre, size) = (centre.into(), size.into());
        Self::new(centre - size / 2., centre + size / 2.)
    }

    /// Returns an [Aabb] that surrounds the two given boxes
    pub fn encompass(a: impl Borrow<Self>, b: impl Borrow<Self>) -> Self {
        let (a, b) = (a.borrow(), b.borrow());
        Self::new(Point3::min(a.min, b.min), Point3::max(a.max, b.max))
    }

    /// [Self::encompass] but for an arbitrary number of boxes. Returns [None] for an empty iterator
    pub fn encompass_iter<B: Borrow<Self>>(iter: impl IntoIterator<Item = B>) -> Option<Self> {
        iter.into_iter()
            .map(|b| *b.borrow())
            .reduce(|a, b| Self::encompass(a, b))
    }

    /// [Self::encompass] but for an arbitrary number of points
    pub fn encompass_points<B: Borrow<Point3>>(iter: impl IntoIterator<Item = B>) -> Self {
        let mut min = Point3::splat(Number::INFINITY);
        let mut max = Point3::splat(Number::NEG_INFINITY);
        for p in iter.into_iter() {
            let p = *p.borrow();
            min = min.min(p);
            max = max.max(p);
        }
        Self::new(min, max)
    }

    /// Returns the region shared by both boxes, or [None] if they are disjoint
    pub fn overlap(a: impl Borrow<Self>, b: impl Borrow<Self>) -> Option<Self> {
        let (a, b) = (a.borrow(), b.borrow());
        let min = Point3::max(a.min, b.min);
        let max = Point3::min(a.max, b.max);
        min.cmple(max).all().then(|| Self::new(min, max))
    }

    /// Ensures that an AABB has all sides of at least `thresh` thickness.
    /// If any side widths between corners are less than this threshold, the [Aabb] will
    /// be expanded (away from the centre) to fit.
    pub fn min_padded(&self, thresh: Number) -> Self {
        let centre = self.min + self.size / 2.;
        Self::new_centred(centre, self.size.max(Vector3::splat(thresh)))
    }

    /// The box surrounding this box once it has been mapped through `transform`
    pub fn transformed(&self, transform: &Transform3) -> Self {
        Self::encompass_points(self.corners().map(|c| transform.transform_point3(c)))
    }
}

// endregion Constructors

// region Helper

impl Aabb {
    /// Returns the corners of the AABB
    pub fn corners(&self) -> [Point3; 8] {
        let (l, h) = (self.min, self.max);
        [
            Point3::new(l.x, l.y, l.z),
            Point3::new(l.x, l.y, h.z),
            Point3::new(l.x, h.y, l.z),
            Point3::new(l.x, h.y, h.z),
            Point3::new(h.x, l.y, l.z),
            Point3::new(h.x, l.y, h.z),
            Point3::new(h.x, h.y, l.z),
            Point3::new(h.x, h.y, h.z),
        ]
    }

    pub fn centre(&self) -> Point3 { self.min + self.size / 2. }
}

// endregion Helper

// region Impl

impl Aabb {
    /// Checks whether the given ray intersects with the AABB at any point within the given distance interval
    pub fn hit(&self, ray: &Ray, interval: &Interval<Number>) -> bool {
        /*
        CREDITS:

        Author: Tavianator
        URL:
            - <https://tavianator.com/2011/ray_box.html>
        */

        // Division by zero gives infinities, which still compare correctly: rays parallel to a slab and outside
        // it end up with `tmin == inf` or `tmax == -inf`
        let t1 = (self.min - ray.pos()) * ray.inv_dir();
        let t2 = (self.max - ray.pos()) * ray.inv_dir();

        // `0 * inf` is NaN for rays starting exactly on a slab plane; `min_element` on NaNs would poison the result,
        // so those axes are treated as unbounded
        let lo = Vector3::select(t1.is_nan_mask(), Vector3::NEG_INFINITY, t1.min(t2));
        let hi = Vector3::select(t1.is_nan_mask(), Vector3::INFINITY, t1.max(t2));
        let lo = Vector3::select(t2.is_nan_mask(), Vector3::NEG_INFINITY, lo);
        let hi = Vector3::select(t2.is_nan_mask(), Vector3::INFINITY, hi);

        let tmin = lo.max_element();
        let tmax = hi.min_element();

        tmin <= tmax && interval.range_overlaps(&tmin, &tmax)
    }
}

// endregion Impl

// region HasAabb trait

// Sometimes `enum_dispatch` tries to generate the enum implementations in this file's scope,
// so have to import the names here
#[allow(unused_imports)]
use crate::shape::{
    blob::BlobShape, lathe::LatheShape, planar::polygon::PolygonShape, planar::smooth_triangle::SmoothTriangleShape,
    planar::triangle::TriangleShape, sphere::SphereShape, torus::TorusShape, ShapeInstance,
};
#[allow(unused_imports)]
use crate::csg::CsgShape;

/// Trait for types that may have a bounding box
#[enum_dispatch]
pub trait HasAabb {
    /// Gets the bounding box. [None] means nothing can ever be hit (e.g. an intersection of disjoint solids)
    fn aabb(&self) -> Option<Aabb>;
}

// endregion HasAabb trait
