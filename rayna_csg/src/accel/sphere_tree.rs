//! A **Bounding Sphere Tree**, used to quickly find which blob elements a ray may pass through
//!
//! The tree is stored in an [indextree] arena. Branches hold a sphere enclosing everything below them,
//! leaves hold the index of the element they bound.

use getset::{CopyGetters, Getters};
use indextree::{Arena, NodeId};
use smallvec::SmallVec;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use tracing::debug;

use crate::core::targets::ACCEL;
use crate::core::types::{Number, Point3};
use crate::shared::aabb::Aabb;
use crate::shared::interval::Interval;
use crate::shared::ray::Ray;

/// The number of elements under which we create leaf nodes directly, instead of splitting further
const MAX_LEAF_NODES: usize = 4;

/// A sphere given by its centre and squared radius
#[derive(CopyGetters, Copy, Clone, Debug, PartialEq)]
#[get_copy = "pub"]
pub struct BoundingSphere {
    centre: Point3,
    radius_sqr: Number,
}

impl BoundingSphere {
    pub fn new(centre: impl Into<Point3>, radius_sqr: Number) -> Self {
        Self {
            centre: centre.into(),
            radius_sqr,
        }
    }

    pub fn radius(&self) -> Number { self.radius_sqr.sqrt() }

    /// The smallest sphere containing both spheres
    pub fn encompass(a: Self, b: Self) -> Self {
        let (ra, rb) = (a.radius(), b.radius());
        let offset = b.centre - a.centre;
        let dist = offset.length();

        if dist + rb <= ra {
            return a;
        }
        if dist + ra <= rb {
            return b;
        }

        let radius = (dist + ra + rb) / 2.0;
        // `dist > 0` here, otherwise one of the spheres would contain the other
        let centre = a.centre + offset * ((radius - ra) / dist);
        Self::new(centre, radius * radius)
    }

    /// Finds the depths where the ray enters and exits the sphere, if those overlap the `interval`
    ///
    /// The ray direction does not have to be normalised
    pub fn hit(&self, ray: &Ray, interval: &Interval<Number>) -> Option<(Number, Number)> {
        let rel = ray.pos() - self.centre;
        let a = ray.dir().length_squared();
        let half_b = rel.dot(ray.dir());
        let c = rel.length_squared() - self.radius_sqr;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0. || a == 0. {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let (t1, t2) = ((-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a);
        interval.range_overlaps(&t1, &t2).then_some((t1, t2))
    }
}

/// The type for each node in the tree
#[derive(Copy, Clone, Debug)]
pub enum SphereTreeNode {
    /// A branch, whose sphere encloses all of its children
    Nested(BoundingSphere),
    /// A leaf for the element at `index`
    Element { index: usize, sphere: BoundingSphere },
}

impl SphereTreeNode {
    pub fn sphere(&self) -> BoundingSphere {
        match self {
            Self::Nested(sphere) | Self::Element { sphere, .. } => *sphere,
        }
    }
}

#[derive(Getters, CopyGetters, Clone, Debug)]
pub struct SphereTree {
    /// The backing store containing all of our nodes, as well as their hierarchy
    #[get = "pub"]
    arena: Arena<SphereTreeNode>,
    /// The root node of the tree
    #[get_copy = "pub"]
    root_id: Option<NodeId>,
}

/// Axis that the elements get sorted along when splitting
#[derive(Copy, Clone, Debug, EnumIter, PartialEq, Eq)]
enum SplitAxis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl SphereTree {
    /// Builds a tree over the given spheres. Element indices are the positions in the iterator
    pub fn new(spheres: impl IntoIterator<Item = BoundingSphere>) -> Self {
        let elements = spheres.into_iter().enumerate().collect::<Vec<_>>();
        let mut arena = Arena::with_capacity(elements.len() * 2);
        let root_id = if elements.is_empty() {
            None
        } else {
            Some(Self::generate_nodes(elements, &mut arena))
        };
        debug!(target: ACCEL, nodes = arena.count(), "built sphere tree");
        Self { arena, root_id }
    }

    /// Recursively splits the elements at the median along the axis with the largest spread of centres
    ///
    /// `elements` must be non-empty
    fn generate_nodes(mut elements: Vec<(usize, BoundingSphere)>, arena: &mut Arena<SphereTreeNode>) -> NodeId {
        if let [(index, sphere)] = elements.as_slice() {
            return arena.new_node(SphereTreeNode::Element {
                index: *index,
                sphere: *sphere,
            });
        }

        let enclosing = elements
            .iter()
            .map(|(_, s)| *s)
            .reduce(BoundingSphere::encompass)
            .unwrap_or_else(|| BoundingSphere::new(Point3::ZERO, 0.));
        let node = arena.new_node(SphereTreeNode::Nested(enclosing));

        if elements.len() <= MAX_LEAF_NODES {
            for (index, sphere) in elements {
                node.append_value(SphereTreeNode::Element { index, sphere }, arena);
            }
            return node;
        }

        let centres = Aabb::encompass_points(elements.iter().map(|(_, s)| s.centre()));
        let axis = SplitAxis::iter()
            .max_by(|a, b| Number::total_cmp(&centres.size()[*a as usize], &centres.size()[*b as usize]))
            .unwrap_or(SplitAxis::X);
        elements.sort_unstable_by(|(_, a), (_, b)| {
            Number::total_cmp(&a.centre()[axis as usize], &b.centre()[axis as usize])
        });

        let upper = elements.split_off(elements.len() / 2);
        for half in [elements, upper] {
            let child = Self::generate_nodes(half, arena);
            node.append(child, arena);
        }
        node
    }

    /// Collects the indices of all elements whose bounding sphere is hit by the ray within `interval`
    pub fn candidates(&self, ray: &Ray, interval: &Interval<Number>, output: &mut SmallVec<[usize; 16]>) {
        self.walk(|s| s.hit(ray, interval).is_some(), output);
    }

    /// Collects the indices of all elements whose bounding sphere contains the point
    pub fn containing(&self, point: Point3, output: &mut SmallVec<[usize; 16]>) {
        self.walk(|s| (point - s.centre()).length_squared() <= s.radius_sqr(), output);
    }

    /// Descends into every node whose sphere passes `test`, collecting the elements at the leaves
    fn walk(&self, test: impl Fn(&BoundingSphere) -> bool, output: &mut SmallVec<[usize; 16]>) {
        let Some(root) = self.root_id else {
            return;
        };

        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            let node = node.get();
            if !test(&node.sphere()) {
                continue;
            }
            match node {
                SphereTreeNode::Nested(_) => stack.extend(id.children(&self.arena)),
                SphereTreeNode::Element { index, .. } => output.push(*index),
            }
        }
    }
}
