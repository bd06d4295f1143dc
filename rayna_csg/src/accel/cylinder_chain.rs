//! Thick bounding cylinders around the local `Y` axis, used to prune lathe segments

use getset::{CopyGetters, Getters};
use smallvec::SmallVec;
use tracing::debug;

use crate::core::targets::ACCEL;
use crate::core::types::Number;
use crate::shared::interval::Interval;
use crate::shared::ray::Ray;

/// A hollow cylinder around the `Y` axis: radii `r_min..=r_max`, heights `h_min..=h_max`
#[derive(CopyGetters, Copy, Clone, Debug, PartialEq)]
#[get_copy = "pub"]
pub struct BoundingCylinder {
    r_min: Number,
    r_max: Number,
    h_min: Number,
    h_max: Number,
}

impl BoundingCylinder {
    pub fn new(r_min: Number, r_max: Number, h_min: Number, h_max: Number) -> Self {
        Self {
            r_min: r_min.min(r_max).max(0.),
            r_max: r_max.max(r_min),
            h_min: h_min.min(h_max),
            h_max: h_max.max(h_min),
        }
    }

    /// Grows the cylinder by `pad` in every direction (except below a radius of zero)
    pub fn padded(&self, pad: Number) -> Self {
        Self::new(
            self.r_min - pad,
            self.r_max + pad,
            self.h_min - pad,
            self.h_max + pad,
        )
    }

    /// Depths along the ray where it is within the solid cylinder of radius `r`, or [None] if it never is.
    /// Rays parallel to the axis are either always or never inside
    fn radial_span(ray: &Ray, r: Number) -> Option<(Number, Number)> {
        let (p, d) = (ray.pos(), ray.dir());
        let a = d.x * d.x + d.z * d.z;
        let half_b = p.x * d.x + p.z * d.z;
        let c = p.x * p.x + p.z * p.z - r * r;

        if a == 0. {
            return (c <= 0.).then_some((Number::NEG_INFINITY, Number::INFINITY));
        }
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0. {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        Some(((-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a))
    }

    /// Depths along the ray where it is between the two cap planes
    fn height_span(&self, ray: &Ray) -> Option<(Number, Number)> {
        let (py, dy) = (ray.pos().y, ray.dir().y);
        if dy == 0. {
            return (self.h_min <= py && py <= self.h_max).then_some((Number::NEG_INFINITY, Number::INFINITY));
        }
        let (t1, t2) = ((self.h_min - py) / dy, (self.h_max - py) / dy);
        Some((t1.min(t2), t1.max(t2)))
    }

    /// Tests whether the ray passes through the cylinder wall within `interval`
    ///
    /// The ray is rejected if the whole part of it inside the outer cylinder also lies inside the inner (hollow)
    /// cylinder
    pub fn hit(&self, ray: &Ray, interval: &Interval<Number>) -> bool {
        let Some((r1, r2)) = Self::radial_span(ray, self.r_max) else {
            return false;
        };
        let Some((h1, h2)) = self.height_span(ray) else {
            return false;
        };
        let Some((lo, hi)) = interval.clip(r1.max(h1), r2.min(h2)) else {
            return false;
        };

        if self.r_min > 0. {
            if let Some((i1, i2)) = Self::radial_span(ray, self.r_min) {
                if i1 <= lo && hi <= i2 {
                    return false;
                }
            }
        }
        true
    }
}

/// One cylinder around a whole lathe, plus one for each of its segments
#[derive(Getters, Clone, Debug)]
#[get = "pub"]
pub struct BoundingCylinderChain {
    whole: BoundingCylinder,
    segments: Vec<BoundingCylinder>,
}

impl BoundingCylinderChain {
    /// Creates the chain from per-segment cylinders. Returns [None] if there are no segments
    pub fn new(segments: Vec<BoundingCylinder>) -> Option<Self> {
        let whole = segments.iter().copied().reduce(|a, b| {
            BoundingCylinder::new(
                a.r_min.min(b.r_min),
                a.r_max.max(b.r_max),
                a.h_min.min(b.h_min),
                a.h_max.max(b.h_max),
            )
        })?;
        debug!(target: ACCEL, segments = segments.len(), ?whole, "built bounding cylinder chain");
        Some(Self { whole, segments })
    }

    /// Collects the indices of the segments whose cylinder the ray passes through
    pub fn candidates(&self, ray: &Ray, interval: &Interval<Number>, output: &mut SmallVec<[usize; 16]>) {
        if !self.whole.hit(ray, interval) {
            return;
        }
        output.extend(
            self.segments
                .iter()
                .enumerate()
                .filter(|(_, cyl)| cyl.hit(ray, interval))
                .map(|(i, _)| i),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_through_the_hole_misses() {
        let cyl = BoundingCylinder::new(1., 2., 0., 1.);
        // Straight down the axis, never touching the wall
        assert!(!cyl.hit(&Ray::new([0., 5., 0.], [0., -1., 0.]), &Interval::FULL));
        // Horizontally through the wall
        assert!(cyl.hit(&Ray::new([-5., 0.5, 0.], [1., 0., 0.]), &Interval::FULL));
        // Above the cylinder
        assert!(!cyl.hit(&Ray::new([-5., 1.5, 0.], [1., 0., 0.]), &Interval::FULL));
    }

    #[test]
    fn chain_selects_segments() {
        let chain = BoundingCylinderChain::new(vec![
            BoundingCylinder::new(0., 1., 0., 1.),
            BoundingCylinder::new(0., 1., 1., 2.),
            BoundingCylinder::new(0., 1., 2., 3.),
        ])
        .expect("non-empty chain");
        let mut out = SmallVec::new();
        chain.candidates(&Ray::new([-5., 1.5, 0.], [1., 0., 0.]), &Interval::from(0.0..), &mut out);
        assert_eq!(out.as_slice(), &[1]);
    }
}
