//! # Module [crate::csg]
//!
//! Constructive solid geometry: boolean combinations of child [Object]s that behave like a single shape.
//!
//! Composites can be nested to any depth (up to [CsgConfig::max_depth]). A composite never stores any geometry
//! of its own; its intersections and its inside test are derived purely from its children. See [walk] for how
//! the children's hits are combined along a ray.

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::debug;
use valuable::Valuable;

use crate::core::targets::CSG;
use crate::core::types::{Number, Point3, Vector3};
use crate::object::{Object, ObjectId};
use crate::shape::Shape;
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{Intersection, IntersectionList};
use crate::shared::ray::Ray;

pub mod walk;

/// The boolean operation a composite applies to its children
#[derive(Display, EnumIter, Serialize, Deserialize, Valuable, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CsgOperation {
    /// Inside any child. Surfaces between overlapping children are dropped
    Union,
    /// Inside every child
    Intersection,
    /// Inside the first child, and outside all the others
    Difference,
    /// Same solid as [CsgOperation::Union], but the internal surfaces are kept (hidden) instead of dropped
    Merge,
}

impl CsgOperation {
    /// Whether this is the asymmetric intersection, where all children after the first are inverted
    pub fn is_difference(&self) -> bool { matches!(self, Self::Difference) }

    /// Whether the composite is inside, given the *effective* inside state of each child
    /// (with subtrahends already inverted for a difference)
    pub(crate) fn predicate(&self, mut effective: impl Iterator<Item = bool>) -> bool {
        match self {
            Self::Union | Self::Merge => effective.any(|s| s),
            Self::Intersection | Self::Difference => {
                let mut any = false;
                effective.all(|s| {
                    any = true;
                    s
                }) && any
            }
        }
    }
}

/// Tuning values for composite intersection
#[derive(Copy, Clone, Debug, PartialEq, Valuable, Serialize, Deserialize)]
pub struct CsgConfig {
    /// Child hits within this depth of each other are treated as a single event, so that touching children
    /// don't produce zero-length intervals
    pub coalesce_epsilon: Number,
    /// Deepest allowed nesting of composites
    pub max_depth: usize,
}

impl Default for CsgConfig {
    fn default() -> Self {
        Self {
            coalesce_epsilon: 1e-6,
            max_depth: 64,
        }
    }
}

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum CsgError {
    #[error("composite nesting depth {depth} exceeds the maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },
}

/// A composite shape, made from a boolean combination of its children
#[derive(Getters, CopyGetters, Clone, Debug)]
pub struct CsgShape {
    #[get_copy = "pub"]
    operation: CsgOperation,
    #[get = "pub"]
    children: Vec<Object>,
    #[get_copy = "pub"]
    config: CsgConfig,
    aabb: Option<Aabb>,
}

// region Constructors

impl CsgShape {
    /// Creates a composite with the default [CsgConfig]
    pub fn new(operation: CsgOperation, children: impl IntoIterator<Item = Object>) -> Result<Self, CsgError> {
        Self::with_config(operation, children, CsgConfig::default())
    }

    pub fn with_config(
        operation: CsgOperation,
        children: impl IntoIterator<Item = Object>,
        config: CsgConfig,
    ) -> Result<Self, CsgError> {
        let children = children.into_iter().collect::<Vec<_>>();
        let depth = 1 + children.iter().map(Object::depth).max().unwrap_or(0);
        if depth > config.max_depth {
            return Err(CsgError::DepthExceeded {
                depth,
                max: config.max_depth,
            });
        }

        let mut csg = Self {
            operation,
            children,
            config,
            aabb: None,
        };
        csg.compute_bbox();
        debug!(target: CSG, %operation, children = csg.children.len(), depth, aabb = ?csg.aabb, "built composite");
        Ok(csg)
    }
}

// endregion Constructors

impl CsgShape {
    /// Mutable access to the children, used to push transforms down the tree.
    ///
    /// [Self::compute_bbox] must be called afterwards
    pub(crate) fn children_mut(&mut self) -> &mut [Object] { &mut self.children }

    /// Nesting depth of this composite, counting itself
    pub fn depth(&self) -> usize { 1 + self.children.iter().map(Object::depth).max().unwrap_or(0) }

    /// Recomputes the bounds from the children's (already up to date) bounds
    ///
    /// Boxes only have to contain the surface crossings the composite can emit:
    /// * a union's crossings are somewhere on its children
    /// * an intersection's crossings lie within every (non-inverted, solid) child
    /// * a difference's crossings lie within its first child
    pub fn compute_bbox(&mut self) {
        let all = || Aabb::encompass_iter(self.children.iter().filter_map(|c| c.aabb()));
        let bounding = |c: &&Object| !c.inverted() && c.is_solid();

        self.aabb = match self.operation {
            CsgOperation::Union | CsgOperation::Merge => all(),
            CsgOperation::Intersection => {
                let mut bounding = self.children.iter().filter(bounding).peekable();
                if bounding.peek().is_none() {
                    all()
                } else {
                    bounding
                        .map(|c| c.aabb())
                        .try_fold(None, |acc: Option<Aabb>, b| {
                            let b = b?;
                            Some(Some(match acc {
                                None => b,
                                Some(acc) => Aabb::overlap(acc, b)?,
                            }))
                        })
                        .flatten()
                }
            }
            CsgOperation::Difference => match self.children.first() {
                None => None,
                Some(first) if bounding(&first) => first.aabb(),
                Some(_) => all(),
            },
        };
    }

    /// Finds the index of the child that produced the leaf hit `id`
    pub(crate) fn child_with_leaf(&self, id: ObjectId) -> Option<usize> {
        self.children.iter().position(|c| c.contains_leaf(id))
    }
}

// region Shape Impl

impl HasAabb for CsgShape {
    fn aabb(&self) -> Option<Aabb> { self.aabb }
}

impl Shape for CsgShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) { walk::walk(self, ray, output) }

    fn inside(&self, point: Point3) -> bool {
        let mut children = self.children.iter();
        match self.operation {
            CsgOperation::Union | CsgOperation::Merge => children.any(|c| c.inside(point)),
            CsgOperation::Intersection => !self.children.is_empty() && children.all(|c| c.inside(point)),
            CsgOperation::Difference => match children.next() {
                None => false,
                Some(first) => first.inside(point) && !children.any(|c| c.inside(point)),
            },
        }
    }

    fn normal(&self, hit: &Intersection) -> Option<Vector3> {
        let id = hit.object?;
        let index = self.child_with_leaf(id)?;
        let n = self.children[index].normal(hit)?;
        // Subtracted children are seen from their inside
        Some(if self.operation.is_difference() && index > 0 { -n } else { n })
    }

    fn is_solid(&self) -> bool { self.children.iter().any(Object::is_solid) }
}

// endregion Shape Impl

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere::SphereShape;

    fn ball(x: Number) -> Object { Object::new(SphereShape::new([x, 0., 0.], 1.).expect("valid sphere")) }

    #[test]
    fn predicates() {
        assert!(CsgOperation::Union.predicate([false, true].into_iter()));
        assert!(!CsgOperation::Intersection.predicate([true, false].into_iter()));
        assert!(!CsgOperation::Intersection.predicate(std::iter::empty()));
        assert!(CsgOperation::Difference.predicate([true, true].into_iter()));
    }

    #[test]
    fn difference_bounds_are_the_first_child() {
        let csg = CsgShape::new(CsgOperation::Difference, [ball(0.), ball(1.5)]).expect("valid csg");
        let aabb = csg.aabb().expect("bounded");
        approx::assert_relative_eq!(aabb.min(), Point3::new(-1., -1., -1.));
        approx::assert_relative_eq!(aabb.max(), Point3::new(1., 1., 1.));
    }

    #[test]
    fn disjoint_intersection_has_no_bounds() {
        let csg = CsgShape::new(CsgOperation::Intersection, [ball(0.), ball(5.)]).expect("valid csg");
        assert_eq!(csg.aabb(), None);
    }

    #[test]
    fn empty_composites() {
        for op in [CsgOperation::Union, CsgOperation::Intersection, CsgOperation::Difference] {
            let csg = CsgShape::new(op, []).expect("valid csg");
            assert!(!csg.inside(Point3::ZERO));
            assert_eq!(csg.aabb(), None);
            let mut out = IntersectionList::new();
            csg.all_intersections(&Ray::new([0., 0., -5.], [0., 0., 1.]), &mut out);
            assert!(out.is_empty());
        }
    }
}
