//! Blobs (metaballs): an isosurface of a density field made up of spherical and cylindrical components
//!
//! The surface is where the summed density of all the elements equals the threshold. Points with a higher density
//! are inside.
//!
//! # Intersection
//!
//! 1. The bounding-sphere tree gives the elements whose bounds the ray passes through
//! 2. Each element's exact region of influence along the ray becomes an enter and an exit event
//! 3. Between consecutive events the set of active elements is fixed, so the field is a single quartic in `t`
//! 4. Spans with one active element are solved in closed form; spans with several use Sturm sequences, since the
//!    summed quartic can be badly conditioned

use std::sync::Arc;

use getset::{CopyGetters, Getters};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};
use valuable::Valuable;

use crate::accel::sphere_tree::{BoundingSphere, SphereTree};
use crate::core::targets::SHAPE;
use crate::core::types::{Number, Point3, Transform3, Vector3};
use crate::object::transform::ObjectTransform;
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{HitData, Intersection, IntersectionList};
use crate::shared::interval::Interval;
use crate::shared::math::{horner, horner_with_derivative};
use crate::shared::ray::Ray;
use crate::solver::{self, MAX_DISTANCE};

use self::element::{BlobElement, BlobElementKind};

pub mod element;

/// Intersections closer than this are ignored. The field is flat near its extremes, so roots are coarse
pub const DEPTH_TOLERANCE: Number = 1e-2;
/// Points whose field is within this of the threshold count as inside
pub const INSIDE_TOLERANCE: Number = 1e-6;
/// Newton steps used to polish each root
const POLISH_STEPS: usize = 4;
/// Roots closer together than this are treated as the same crossing
const DUPLICATE_ROOT: Number = 1e-9;

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum BlobInvalidError {
    #[error("threshold must be positive and finite, got {threshold}")]
    Threshold { threshold: Number },
    #[error("blob has no components")]
    NoComponents,
    #[error("component {index} has a non-positive radius {radius}")]
    Radius { index: usize, radius: Number },
    #[error("cylinder component {index} has the same base and apex")]
    CylinderLength { index: usize },
    #[error("component {index} has a singular transform")]
    SingularTransform { index: usize },
}

/// One component of a blob, as it would be described in a scene
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub enum BlobComponent {
    /// A sphere, which becomes an ellipsoid if it has its own transform
    Sphere {
        centre: Point3,
        radius: Number,
        strength: Number,
        transform: Option<Transform3>,
    },
    /// A cylinder with rounded (hemispherical) ends
    Cylinder {
        base: Point3,
        apex: Point3,
        radius: Number,
        strength: Number,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlobBuilder {
    pub threshold: Number,
    pub components: Vec<BlobComponent>,
}

/// The shared, immutable part of a blob
#[derive(Getters, Debug)]
#[get = "pub"]
pub struct BlobData {
    elements: Vec<BlobElement>,
    tree: SphereTree,
}

#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct BlobShape {
    #[get_copy = "pub"]
    threshold: Number,
    #[get = "pub"]
    data: Arc<BlobData>,
    aabb: Aabb,
}

// region Constructors

impl BlobShape {
    pub fn new(threshold: Number, components: impl IntoIterator<Item = BlobComponent>) -> Result<Self, BlobInvalidError> {
        BlobBuilder {
            threshold,
            components: components.into_iter().collect(),
        }
        .try_into()
    }

    /// Expands a component into its elements
    fn push_elements(
        index: usize,
        component: BlobComponent,
        elements: &mut Vec<BlobElement>,
    ) -> Result<(), BlobInvalidError> {
        match component {
            BlobComponent::Sphere {
                centre,
                radius,
                strength,
                transform,
            } => {
                if !(radius > 0. && radius.is_finite()) {
                    return Err(BlobInvalidError::Radius { index, radius });
                }
                let (kind, frame) = match transform {
                    None => (BlobElementKind::Sphere, Transform3::from_translation(centre)),
                    Some(t) => (BlobElementKind::Ellipsoid, t * Transform3::from_translation(centre)),
                };
                let frame = ObjectTransform::new(frame).map_err(|_| BlobInvalidError::SingularTransform { index })?;
                elements.push(BlobElement::new(kind, frame, radius, strength, 0.));
            }
            BlobComponent::Cylinder {
                base,
                apex,
                radius,
                strength,
            } => {
                if !(radius > 0. && radius.is_finite()) {
                    return Err(BlobInvalidError::Radius { index, radius });
                }
                let axis = apex - base;
                let len = axis.length();
                let Some(axis) = axis.try_normalize() else {
                    return Err(BlobInvalidError::CylinderLength { index });
                };

                let rotation = glam::DQuat::from_rotation_arc(Vector3::Z, axis);
                let frame = Transform3::from_rotation_translation(rotation, base);
                let apex_frame = frame * Transform3::from_translation(Vector3::new(0., 0., len));
                let frame = ObjectTransform::new(frame).map_err(|_| BlobInvalidError::SingularTransform { index })?;
                let apex_frame =
                    ObjectTransform::new(apex_frame).map_err(|_| BlobInvalidError::SingularTransform { index })?;

                elements.push(BlobElement::new(BlobElementKind::Cylinder, frame, radius, strength, len));
                elements.push(BlobElement::new(BlobElementKind::BaseHemisphere, frame, radius, strength, 0.));
                elements.push(BlobElement::new(BlobElementKind::ApexHemisphere, apex_frame, radius, strength, 0.));
            }
        }
        Ok(())
    }
}

impl TryFrom<BlobBuilder> for BlobShape {
    type Error = BlobInvalidError;

    fn try_from(value: BlobBuilder) -> Result<Self, Self::Error> {
        let BlobBuilder { threshold, components } = value;
        if !(threshold > 0. && threshold.is_finite()) {
            return Err(BlobInvalidError::Threshold { threshold });
        }
        if components.is_empty() {
            return Err(BlobInvalidError::NoComponents);
        }

        let mut elements = Vec::with_capacity(components.len() * 3);
        for (index, component) in components.into_iter().enumerate() {
            Self::push_elements(index, component, &mut elements)?;
        }

        let aabbs = elements.iter().map(BlobElement::aabb).collect::<Vec<_>>();
        // Bounding spheres around each element's box. Loose for ellipsoids, but always conservative
        let tree = SphereTree::new(aabbs.iter().map(|b| BoundingSphere::new(b.centre(), b.size().length_squared() / 4.)));
        let aabb = Aabb::encompass_iter(&aabbs).ok_or(BlobInvalidError::NoComponents)?;

        debug!(target: SHAPE, elements = elements.len(), threshold, "built blob");
        Ok(Self {
            threshold,
            data: Arc::new(BlobData { elements, tree }),
            aabb,
        })
    }
}

impl TryFrom<BlobBuilder> for ShapeInstance {
    type Error = BlobInvalidError;

    fn try_from(value: BlobBuilder) -> Result<Self, Self::Error> { BlobShape::try_from(value).map(Into::into) }
}

// endregion Constructors

// region Field

impl BlobShape {
    /// The summed density of all elements at a point
    pub fn field(&self, point: Point3) -> Number {
        let mut nearby = SmallVec::<[usize; 16]>::new();
        self.data.tree.containing(point, &mut nearby);
        nearby.into_iter().map(|i| self.data.elements[i].density(point)).sum()
    }

    /// Tightens a root with Newton steps, stopping as soon as a step stops improving it
    fn polish(coeffs: &[Number], mut t: Number) -> Number {
        for _ in 0..POLISH_STEPS {
            let (f, df) = horner_with_derivative(coeffs, t);
            if f == 0. || df == 0. {
                break;
            }
            let next = t - f / df;
            if horner(coeffs, next).abs() >= f.abs() {
                break;
            }
            t = next;
        }
        t
    }

    /// Finds the crossings of `coeffs` (the field minus the threshold) within the span `(lo, hi]`
    ///
    /// A single element is solved in closed form. Summed quartics are badly conditioned, and can cross twice in a
    /// tiny distance, so they always go through Sturm sequences
    fn span_roots(coeffs: &[Number; 5], single: bool, lo: Number, hi: Number, output: &mut SmallVec<[Number; 8]>) {
        output.extend(
            solver::solve_polynomial(coeffs, !single, 0.)
                .into_iter()
                .map(|t| Self::polish(coeffs, t))
                .filter(|&t| t > lo && t <= hi),
        );
    }
}

// endregion Field

// region Shape Impl

impl HasAabb for BlobShape {
    fn aabb(&self) -> Option<Aabb> { Some(self.aabb) }
}

impl Shape for BlobShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        let data = &*self.data;
        let mut candidates = SmallVec::<[usize; 16]>::new();
        data.tree
            .candidates(ray, &Interval::from(DEPTH_TOLERANCE..MAX_DISTANCE), &mut candidates);

        // Enter (`true`) and exit (`false`) events for each element's region of influence
        let events = candidates
            .into_iter()
            .filter_map(|i| data.elements[i].influence(ray).map(|span| (i, span)))
            .filter(|&(_, (_, hi))| hi > 0.)
            .flat_map(|(i, (lo, hi))| [(lo.max(0.), i, true), (hi.min(MAX_DISTANCE), i, false)])
            .sorted_by(|a, b| Number::total_cmp(&a.0, &b.0))
            .collect::<SmallVec<[(Number, usize, bool); 16]>>();

        let mut active = SmallVec::<[usize; 16]>::new();
        let mut roots = SmallVec::<[Number; 8]>::new();
        for (&(t, index, enter), next) in events.iter().zip(events.iter().skip(1)) {
            if enter {
                active.push(index);
            } else {
                active.retain(|&mut i| i != index);
            }
            let (lo, hi) = (t, next.0);
            if active.is_empty() || hi <= lo {
                continue;
            }

            let mut coeffs = [0., 0., 0., 0., -self.threshold];
            for &i in &active {
                for (c, q) in coeffs.iter_mut().zip(data.elements[i].quartic(ray)) {
                    *c += q;
                }
            }
            Self::span_roots(&coeffs, active.len() == 1, lo, hi, &mut roots);
        }

        roots.sort_by(Number::total_cmp);
        roots.dedup_by(|a, b| (*a - *b).abs() < DUPLICATE_ROOT);
        for t in roots {
            if t <= DEPTH_TOLERANCE {
                trace!(target: SHAPE, t, "blob root too close");
                continue;
            }
            output.push(Intersection::new_local(t, ray.at(t), HitData::None));
        }
    }

    fn inside(&self, point: Point3) -> bool { self.field(point) > self.threshold - INSIDE_TOLERANCE }

    fn normal(&self, hit: &Intersection) -> Option<Vector3> {
        let mut nearby = SmallVec::<[usize; 16]>::new();
        self.data.tree.containing(hit.pos_l, &mut nearby);
        let gradient = nearby
            .into_iter()
            .map(|i| self.data.elements[i].gradient(hit.pos_l))
            .fold(Vector3::ZERO, |acc, g| acc + g);
        // Density increases towards the inside, so the outward normal is down the gradient
        Some((-gradient).try_normalize().unwrap_or(Vector3::X))
    }
}

// endregion Shape Impl

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ball(centre: [Number; 3], radius: Number) -> BlobComponent {
        BlobComponent::Sphere {
            centre: centre.into(),
            radius,
            strength: 1.,
            transform: None,
        }
    }

    fn depths(blob: &BlobShape, ray: Ray) -> Vec<Number> {
        let mut out = IntersectionList::new();
        blob.all_intersections(&ray, &mut out);
        out.iter().map(|i| i.dist).collect()
    }

    #[test]
    fn single_sphere_surface_radius() {
        // Density is (1 - r²/R²)², so the surface is at r = R·sqrt(1 - sqrt(threshold))
        let blob = BlobShape::new(0.25, [ball([0., 0., 0.], 2.)]).expect("valid blob");
        let expected = 2. * (1. - 0.5 as Number).sqrt();
        let d = depths(&blob, Ray::new([-5., 0., 0.], [1., 0., 0.]));
        assert_eq!(d.len(), 2, "depths: {d:?}");
        assert_relative_eq!(d[0], 5. - expected, epsilon = 1e-7);
        assert_relative_eq!(d[1], 5. + expected, epsilon = 1e-7);

        let mut out = IntersectionList::new();
        blob.all_intersections(&Ray::new([-5., 0., 0.], [1., 0., 0.]), &mut out);
        assert_relative_eq!(blob.normal(&out[0]).expect("normal"), Vector3::NEG_X, epsilon = 1e-7);
    }

    #[test]
    fn overlapping_spheres_merge() {
        let blob = BlobShape::new(0.6, [ball([-0.8, 0., 0.], 1.5), ball([0.8, 0., 0.], 1.5)]).expect("valid blob");
        // Each sphere on its own has density < 0.6 at the origin, but together they are above it
        assert!(blob.inside(Point3::ZERO));
        let d = depths(&blob, Ray::new([-5., 0., 0.], [1., 0., 0.]));
        assert_eq!(d.len(), 2, "depths: {d:?}");
        for (&t, expected) in d.iter().zip([-1., 1.]) {
            let p = Ray::new([-5., 0., 0.], [1., 0., 0.]).at(t);
            assert_relative_eq!(blob.field(p), 0.6, epsilon = 1e-7);
            assert_eq!(p.x.signum(), expected);
        }
    }

    /// A faint, wide element overlapping a strong one, with the threshold just under the strong element's peak
    ///
    /// The surface is a tiny bump around the strong element's centre, entered and left within a few hundredths of
    /// a unit, while the span where both elements are active is two units long
    #[test]
    fn narrow_crossing_in_overlap() {
        let blob = BlobShape::new(
            0.999,
            [
                ball([0., 0., 0.], 1.),
                BlobComponent::Sphere {
                    centre: Point3::new(-9.5, 0., 0.),
                    radius: 10.,
                    strength: 0.05,
                    transform: None,
                },
            ],
        )
        .expect("valid blob");
        assert!(blob.inside(Point3::ZERO));

        let ray = Ray::new([-5., 0., 0.], [1., 0., 0.]);
        let d = depths(&blob, ray);
        assert_eq!(d.len(), 2, "depths: {d:?}");
        assert!(d[0] < 5. && d[1] > 5. && d[1] - d[0] < 0.1, "depths: {d:?}");
        for t in d {
            assert_relative_eq!(blob.field(ray.at(t)), 0.999, epsilon = 1e-9);
        }
    }

    #[test]
    fn cylinder_component_has_rounded_ends() {
        let blob = BlobShape::new(
            0.25,
            [BlobComponent::Cylinder {
                base: Point3::new(0., 0., 0.),
                apex: Point3::new(0., 4., 0.),
                radius: 1.,
                strength: 1.,
            }],
        )
        .expect("valid blob");
        assert_eq!(blob.data().elements().len(), 3);
        assert!(blob.inside(Point3::new(0., 2., 0.)));
        assert!(blob.inside(Point3::new(0., -0.3, 0.)));
        assert!(!blob.inside(Point3::new(0., -0.9, 0.)));
        // Straight down the axis: enters through the apex cap and leaves through the base cap
        let d = depths(&blob, Ray::new([0., 10., 0.], [0., -1., 0.]));
        assert_eq!(d.len(), 2, "depths: {d:?}");
    }

    #[test]
    fn invalid_blobs() {
        assert!(matches!(
            BlobShape::new(0., [ball([0., 0., 0.], 1.)]),
            Err(BlobInvalidError::Threshold { .. })
        ));
        assert_eq!(BlobShape::new(0.5, []).err(), Some(BlobInvalidError::NoComponents));
        assert!(matches!(
            BlobShape::new(0.5, [ball([0., 0., 0.], 1.), ball([0., 0., 0.], -1.)]),
            Err(BlobInvalidError::Radius { index: 1, .. })
        ));
    }
}
