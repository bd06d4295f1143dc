//! Individual blob elements, and their density functions
//!
//! Every element lives in its own frame, where its field is radially symmetric:
//!
//! * spheres and ellipsoids are centred on the origin (ellipsoids are spheres in a scaled frame)
//! * cylinders run along `+Z` from `z = 0` to `z = len`, and only the distance from the `Z` axis counts
//! * hemispheres cap a cylinder; the base one covers `z <= 0`, the apex one (in a frame shifted up by `len`)
//!   covers `z >= 0`
//!
//! Inside its radius, an element's density is `c0·r⁴ + c1·r² + c2`, which falls smoothly to zero at the radius.

use getset::CopyGetters;
use num_traits::Zero;
use strum_macros::Display;

use crate::core::types::{Number, Point3, Vector3};
use crate::object::transform::ObjectTransform;
use crate::shared::aabb::Aabb;
use crate::shared::ray::Ray;
use crate::solver::closed_form::solve_quadratic;

#[derive(Display, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlobElementKind {
    Sphere,
    Ellipsoid,
    Cylinder,
    BaseHemisphere,
    ApexHemisphere,
}

#[derive(CopyGetters, Copy, Clone, Debug)]
#[get_copy = "pub"]
pub struct BlobElement {
    kind: BlobElementKind,
    /// Maps element space into blob space
    frame: ObjectTransform,
    radius_sqr: Number,
    /// Length along `Z`, only meaningful for cylinders
    len: Number,
    /// Density coefficients `[c0, c1, c2]`
    coeffs: [Number; 3],
}

impl BlobElement {
    pub fn new(kind: BlobElementKind, frame: ObjectTransform, radius: Number, strength: Number, len: Number) -> Self {
        let radius_sqr = radius * radius;
        Self {
            kind,
            frame,
            radius_sqr,
            len,
            coeffs: [
                strength / (radius_sqr * radius_sqr),
                -2. * strength / radius_sqr,
                strength,
            ],
        }
    }

    /// The part of a local point that the density depends on
    fn radial(&self, local: Point3) -> Vector3 {
        match self.kind {
            BlobElementKind::Cylinder => Vector3::new(local.x, local.y, 0.),
            _ => local,
        }
    }

    /// Whether a local height is within the element's extent along `Z`
    fn in_extent(&self, z: Number) -> bool {
        match self.kind {
            BlobElementKind::Sphere | BlobElementKind::Ellipsoid => true,
            BlobElementKind::Cylinder => (0. ..=self.len).contains(&z),
            BlobElementKind::BaseHemisphere => z <= 0.,
            BlobElementKind::ApexHemisphere => z >= 0.,
        }
    }

    /// Density at a point in blob space
    pub fn density(&self, point: Point3) -> Number {
        let local = self.frame.incoming_point(point);
        let r2 = self.radial(local).length_squared();
        if r2 >= self.radius_sqr || !self.in_extent(local.z) {
            return 0.;
        }
        let [c0, c1, c2] = self.coeffs;
        (c0 * r2 + c1) * r2 + c2
    }

    /// Gradient of the density at a point in blob space
    pub fn gradient(&self, point: Point3) -> Vector3 {
        let local = self.frame.incoming_point(point);
        let radial = self.radial(local);
        let r2 = radial.length_squared();
        if r2 >= self.radius_sqr || !self.in_extent(local.z) {
            return Vector3::ZERO;
        }
        let [c0, c1, _] = self.coeffs;
        // d/dp (c0·r⁴ + c1·r²) = (2·c0·r² + c1)·2·radial
        let local_grad = radial * (2. * (2. * c0 * r2 + c1));
        // Gradients are covectors, so they map back with the inverse-transpose
        self.frame.inv_transform().matrix3.transpose() * local_grad
    }

    /// The ray (in blob space) mapped into element space, giving `r²(t) = t2·t² + 2·t1·t + t0`
    fn radial_terms(&self, ray: &Ray) -> (Ray, Number, Number, Number) {
        let local = self.frame.incoming_ray(ray);
        let (p, d) = (self.radial(local.pos()), self.radial(local.dir()));
        (local, d.length_squared(), p.dot(d), p.length_squared())
    }

    /// The depths along the ray where it is within this element's region of influence
    pub fn influence(&self, ray: &Ray) -> Option<(Number, Number)> {
        let (local, t2, t1, t0) = self.radial_terms(ray);

        let (mut lo, mut hi) = if t2.is_zero() {
            // Only possible for cylinders, with the ray running parallel to the axis
            if t0 >= self.radius_sqr {
                return None;
            }
            (Number::NEG_INFINITY, Number::INFINITY)
        } else {
            let roots = solve_quadratic(t2, 2. * t1, t0 - self.radius_sqr);
            match roots.as_slice() {
                &[a, b] => (a.min(b), a.max(b)),
                _ => return None,
            }
        };

        // Clip against the planes bounding the element along `Z`
        let (pz, dz) = (local.pos().z, local.dir().z);
        let planes: &[(Number, bool)] = match self.kind {
            BlobElementKind::Sphere | BlobElementKind::Ellipsoid => &[],
            BlobElementKind::Cylinder => &[(0., true), (self.len, false)],
            BlobElementKind::BaseHemisphere => &[(0., false)],
            BlobElementKind::ApexHemisphere => &[(0., true)],
        };
        for &(plane, keep_above) in planes {
            if dz.is_zero() {
                if (pz >= plane) != keep_above && pz != plane {
                    return None;
                }
                continue;
            }
            let t = (plane - pz) / dz;
            // Moving up the axis means we cross into the `above` side at `t`
            if (dz > 0.) == keep_above {
                lo = lo.max(t);
            } else {
                hi = hi.min(t);
            }
        }

        (lo < hi).then_some((lo, hi))
    }

    /// The density along the ray as a quartic in `t` (highest degree first), valid within [Self::influence]
    pub fn quartic(&self, ray: &Ray) -> [Number; 5] {
        let (_, t2, t1, t0) = self.radial_terms(ray);
        let [c0, c1, c2] = self.coeffs;
        [
            c0 * t2 * t2,
            4. * c0 * t1 * t2,
            c0 * (4. * t1 * t1 + 2. * t0 * t2) + c1 * t2,
            4. * c0 * t0 * t1 + 2. * c1 * t1,
            c0 * t0 * t0 + c1 * t0 + c2,
        ]
    }

    /// Blob space box around the region of influence
    pub fn aabb(&self) -> Aabb {
        let r = self.radius_sqr.sqrt();
        let local = match self.kind {
            BlobElementKind::Sphere | BlobElementKind::Ellipsoid => Aabb::new([-r, -r, -r], [r, r, r]),
            BlobElementKind::Cylinder => Aabb::new([-r, -r, 0.], [r, r, self.len]),
            BlobElementKind::BaseHemisphere => Aabb::new([-r, -r, -r], [r, r, 0.]),
            BlobElementKind::ApexHemisphere => Aabb::new([-r, -r, 0.], [r, r, r]),
        };
        local.transformed(&self.frame.transform())
    }
}
