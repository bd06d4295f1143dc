//! # Module [crate::object]
//!
//! The [Object] is the unit the rest of the engine works with: a [ShapeInstance] plus everything about *where* and
//! *how* it sits in the scene (transform, inversion, surface, identity).
//!
//! Shapes only ever see rays in their own local space. The object maps incoming rays with the inverse transform,
//! and maps results back out again. Ray directions are not renormalised when mapping, so the depth of a hit is the
//! same in every space, and no per-hit depth conversion is needed.
//!
//! # Important Note
//! Composites ([CsgShape](crate::csg::CsgShape)) never carry a transform themselves. Transforming a composite pushes the
//! transform down into every one of its children, which keeps all leaf transforms flat (one matrix per leaf).

use getset::CopyGetters;
use static_assertions::assert_impl_all;
use tracing::trace;

use crate::core::targets::MAIN;
use crate::core::types::{Number, Point3, Transform3, Vector3};
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{Intersection, IntersectionList};
use crate::shared::interval::Interval;
use crate::shared::math;
use crate::shared::ray::Ray;
use crate::shared::validate;

pub use self::id::{ObjectId, SurfaceId};
use self::transform::{ObjectTransform, TransformError};

pub mod id;
pub mod transform;

/// A shape placed in the scene
///
/// Copies (through [Clone] or [Object::copy]) share any heavy shape data, but always get a new [ObjectId],
/// including for every object nested inside them.
#[derive(CopyGetters, Debug)]
pub struct Object {
    shape: ShapeInstance,
    transform: Option<ObjectTransform>,
    /// Swaps inside and outside, and flips the normals
    #[get_copy = "pub"]
    inverted: bool,
    #[get_copy = "pub"]
    surface: Option<SurfaceId>,
    #[get_copy = "pub"]
    id: ObjectId,
    aabb: Option<Aabb>,
}

assert_impl_all!(Object: Send, Sync);
assert_impl_all!(ShapeInstance: Send, Sync);

/// The result of [Object::determine_surface]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceSelection {
    /// The leaf object that was hit
    pub leaf: ObjectId,
    /// The innermost surface assigned along the path to that leaf
    pub surface: Option<SurfaceId>,
    pub pos_l: Point3,
    pub pos_w: Point3,
}

// region Constructors

impl Object {
    pub fn new(shape: impl Into<ShapeInstance>) -> Self {
        let mut obj = Self {
            shape: shape.into(),
            transform: None,
            inverted: false,
            surface: None,
            id: ObjectId::next(),
            aabb: None,
        };
        obj.compute_bbox();
        obj
    }

    pub fn with_surface(mut self, surface: SurfaceId) -> Self {
        self.surface = Some(surface);
        self
    }

    /// A deep copy, with fresh ids. Identical to [Clone::clone]
    pub fn copy(&self) -> Self { self.clone() }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            transform: self.transform,
            inverted: self.inverted,
            surface: self.surface,
            id: ObjectId::next(),
            aabb: self.aabb,
        }
    }
}

// endregion Constructors

// region Getters

impl Object {
    pub fn shape(&self) -> &ShapeInstance { &self.shape }

    /// The object-to-world transform of a leaf. Composites always return [None]
    pub fn current_transform(&self) -> Option<ObjectTransform> { self.transform }

    pub fn set_surface(&mut self, surface: Option<SurfaceId>) { self.surface = surface; }

    /// Whether the shape encloses a volume (see [Shape::is_solid])
    pub fn is_solid(&self) -> bool { self.shape.is_solid() }

    /// Nesting depth of composites, where a leaf has a depth of 1
    pub fn depth(&self) -> usize {
        match &self.shape {
            ShapeInstance::CsgShape(csg) => csg.depth(),
            _ => 1,
        }
    }

    /// Whether `id` is this object, or a leaf somewhere inside it
    pub fn contains_leaf(&self, id: ObjectId) -> bool {
        match &self.shape {
            ShapeInstance::CsgShape(csg) => csg.children().iter().any(|c| c.contains_leaf(id)),
            _ => self.id == id,
        }
    }
}

// endregion Getters

// region Transforms

impl Object {
    /// Applies `transform` after any existing transform
    ///
    /// Fails (leaving the object untouched) if the matrix has no inverse
    pub fn transform(&mut self, transform: Transform3) -> Result<(), TransformError> {
        let transform = ObjectTransform::new(transform)?;
        self.apply(&transform);
        Ok(())
    }

    pub fn translate(&mut self, offset: impl Into<Vector3>) {
        self.apply(&ObjectTransform::translation(offset.into()));
    }

    /// Rotates by the euler angles (in degrees), rotating around `X` first, then `Y`, then `Z`
    pub fn rotate(&mut self, degrees: impl Into<Vector3>) {
        self.apply(&ObjectTransform::rigid(math::rotation_degrees(degrees.into())));
    }

    pub fn scale(&mut self, scale: impl Into<Vector3>) -> Result<(), TransformError> {
        self.transform(Transform3::from_scale(scale.into()))
    }

    /// Swaps the inside and outside of the object
    pub fn invert(&mut self) { self.inverted = !self.inverted; }

    fn apply(&mut self, transform: &ObjectTransform) {
        match &mut self.shape {
            ShapeInstance::CsgShape(csg) => {
                for child in csg.children_mut() {
                    child.apply(transform);
                }
                csg.compute_bbox();
            }
            _ => {
                self.transform = Some(match &self.transform {
                    None => *transform,
                    Some(old) => old.then(transform),
                });
            }
        }
        self.compute_bbox();
    }

    /// Recomputes the world-space bounding box
    pub fn compute_bbox(&mut self) {
        let local = self.shape.aabb();
        self.aabb = match &self.transform {
            None => local,
            Some(t) => local.map(|b| b.transformed(&t.transform())),
        };
    }
}

// endregion Transforms

// region Queries

impl Object {
    /// Finds every crossing of the ray with the object's surface, appending them (sorted by depth) to `output`
    ///
    /// Each hit gets tagged with the id of the leaf object that produced it
    pub fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        let Some(aabb) = &self.aabb else {
            return;
        };
        if !aabb.hit(ray, &Interval::from(0.0..)) {
            return;
        }

        let local = ObjectTransform::maybe_incoming_ray(&self.transform, ray);
        let start = output.len();
        self.shape.all_intersections(&local, output);

        for hit in &mut output[start..] {
            hit.object.get_or_insert(self.id);
            hit.pos_w = ray.at(hit.dist);
        }
        validate::sorted(&output[start..]);
    }

    /// The closest visible hit along the ray
    pub fn nearest_intersection(&self, ray: &Ray) -> Option<Intersection> {
        self.nearest_in(ray, &mut IntersectionList::new())
    }

    /// [Self::nearest_intersection], using a caller-provided scratch list
    pub(crate) fn nearest_in(&self, ray: &Ray, scratch: &mut IntersectionList) -> Option<Intersection> {
        scratch.clear();
        self.all_intersections(ray, scratch);
        let nearest = scratch.iter().find(|h| h.visible).copied();
        if let Some(hit) = &nearest {
            validate::intersection(ray, hit);
        }
        nearest
    }

    pub fn inside(&self, point: Point3) -> bool {
        let local = ObjectTransform::maybe_incoming_point(&self.transform, point);
        self.shape.is_solid() && (self.shape.inside(local) != self.inverted)
    }

    /// The world-space outward unit normal at a hit produced by this object (or one of its leaves)
    ///
    /// Returns [None] for hits that didn't come from this object, or if the normal is degenerate
    pub fn normal(&self, hit: &Intersection) -> Option<Vector3> {
        if !hit.object.is_some_and(|id| self.contains_leaf(id)) {
            return None;
        }
        let n = self.shape.normal(hit)?;
        let n = match &self.transform {
            None => n,
            Some(t) => t.outgoing_normal(n)?,
        };
        let n = if self.inverted { -n } else { n };
        validate::normal3(n);
        Some(n)
    }

    /// Finds the leaf that produced `hit`, and the surface that applies to it
    ///
    /// The surface is the innermost one assigned along the path from this object down to the leaf,
    /// so a leaf's own surface wins over the surface of any composite containing it
    pub fn determine_surface(&self, hit: &Intersection) -> Option<SurfaceSelection> {
        let leaf = hit.object?;
        let found = self.find_surface(hit, leaf, None);
        if found.is_none() {
            trace!(target: MAIN, %leaf, "hit does not belong to this object");
        }
        found
    }

    fn find_surface(&self, hit: &Intersection, leaf: ObjectId, inherited: Option<SurfaceId>) -> Option<SurfaceSelection> {
        let surface = self.surface.or(inherited);
        match &self.shape {
            ShapeInstance::CsgShape(csg) => csg
                .children()
                .iter()
                .find_map(|c| c.find_surface(hit, leaf, surface)),
            _ => (self.id == leaf).then_some(SurfaceSelection {
                leaf,
                surface,
                pos_l: hit.pos_l,
                pos_w: hit.pos_w,
            }),
        }
    }

    /// The depth of the nearest visible hit, if any
    pub fn nearest_depth(&self, ray: &Ray) -> Option<Number> { self.nearest_intersection(ray).map(|h| h.dist) }
}

impl HasAabb for Object {
    fn aabb(&self) -> Option<Aabb> { self.aabb }
}

// endregion Queries

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere::SphereShape;
    use approx::assert_relative_eq;

    fn unit_sphere() -> Object { Object::new(SphereShape::new([0., 0., 0.], 1.).expect("valid sphere")) }

    #[test]
    fn translated_sphere() {
        let mut obj = unit_sphere();
        obj.translate([3., 0., 0.]);
        let hit = obj
            .nearest_intersection(&Ray::new([0., 0., 0.], [1., 0., 0.]))
            .expect("should hit");
        assert_relative_eq!(hit.dist, 2.);
        assert_relative_eq!(hit.pos_w, Point3::new(2., 0., 0.));
        assert_relative_eq!(hit.pos_l, Point3::new(-1., 0., 0.));
        assert_eq!(hit.object, Some(obj.id()));
        assert_relative_eq!(obj.normal(&hit).expect("normal"), Vector3::NEG_X);
        assert!(obj.inside(Point3::new(3.5, 0., 0.)));
    }

    #[test]
    fn scaled_depths_are_world_distances() {
        let mut obj = unit_sphere();
        obj.scale([2., 2., 2.]).expect("invertible");
        let hit = obj
            .nearest_intersection(&Ray::new([-5., 0., 0.], [1., 0., 0.]))
            .expect("should hit");
        assert_relative_eq!(hit.dist, 3., epsilon = 1e-9);
        assert_relative_eq!(obj.aabb().expect("bounded").max(), Point3::splat(2.), epsilon = 1e-9);
    }

    #[test]
    fn singular_scale_is_rejected() {
        let mut obj = unit_sphere();
        assert!(obj.scale([1., 0., 1.]).is_err());
        assert_eq!(obj.current_transform(), None);
    }

    #[test]
    fn inverted_object() {
        let mut obj = unit_sphere();
        obj.invert();
        assert!(!obj.inside(Point3::ZERO));
        assert!(obj.inside(Point3::splat(5.)));
        let hit = obj
            .nearest_intersection(&Ray::new([-5., 0., 0.], [1., 0., 0.]))
            .expect("intersections are unchanged");
        assert_relative_eq!(obj.normal(&hit).expect("normal"), Vector3::X);
    }

    #[test]
    fn normals_only_for_own_hits() {
        let (a, b) = (unit_sphere(), unit_sphere());
        let ray = Ray::new([-5., 0., 0.], [1., 0., 0.]);
        let hit = a.nearest_intersection(&ray).expect("should hit");
        assert!(a.normal(&hit).is_some());
        assert_eq!(b.normal(&hit), None);

        let mut untagged = IntersectionList::new();
        a.shape().all_intersections(&ray, &mut untagged);
        assert_eq!(a.normal(&untagged[0]), None);
    }

    #[test]
    fn copies_get_new_ids() {
        let obj = unit_sphere().with_surface(SurfaceId(7));
        let copy = obj.copy();
        assert_ne!(obj.id(), copy.id());
        assert_eq!(copy.surface(), Some(SurfaceId(7)));
    }
}
