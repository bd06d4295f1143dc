use std::cmp::Ordering;

use derivative::Derivative;
use smallvec::SmallVec;

use crate::core::types::{Number, Point3};
use crate::object::ObjectId;

/// The list type that intersections are accumulated into
///
/// Most rays only cross a handful of surfaces, so this avoids heap allocations in the common case
pub type IntersectionList = SmallVec<[Intersection; 16]>;

/// A struct representing a single ray-surface crossing
#[derive(Copy, Clone, Debug, Derivative)]
#[derivative(PartialEq)]
pub struct Intersection {
    /// Distance along the ray that the intersection occurred
    ///
    /// For a ray with a normalised direction, this is the world-space distance
    pub dist: Number,
    /// The position in world coordinates of the intersection
    pub pos_w: Point3,
    /// The position in the local coordinates of the leaf shape that was hit
    #[derivative(PartialEq = "ignore")]
    pub pos_l: Point3,
    /// The leaf object that produced this intersection
    ///
    /// Shapes leave this empty; it gets filled in by the [crate::object::Object] that owns the shape
    pub object: Option<ObjectId>,
    /// Shape-specific data needed to compute the normal later on
    #[derivative(PartialEq = "ignore")]
    pub data: HitData,
    /// Whether this is a real surface crossing.
    ///
    /// Merged composites keep the internal surfaces between their children, but mark them as hidden
    pub visible: bool,
}

/// Extra geometry-specific data attached to an [Intersection]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum HitData {
    #[default]
    None,
    /// Which lathe segment was hit, and at which spline parameter
    Lathe { segment: usize, w: Number },
}

impl Intersection {
    /// Creates a new visible intersection, in the local space of a shape
    ///
    /// The world position is filled in by the owning object
    pub fn new_local(dist: Number, pos_l: Point3, data: HitData) -> Self {
        Self {
            dist,
            pos_w: pos_l,
            pos_l,
            object: None,
            data,
            visible: true,
        }
    }
}

impl PartialOrd<Self> for Intersection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Number::partial_cmp(&self.dist, &other.dist) }
}

/// Sorts intersections by ascending depth
pub fn sort_by_dist(list: &mut [Intersection]) { list.sort_by(|a, b| Number::total_cmp(&a.dist, &b.dist)); }
