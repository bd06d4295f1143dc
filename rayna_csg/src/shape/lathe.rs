//! A surface of revolution, made by spinning a 2D spline profile around the local `Y` axis
//!
//! Profile points are `(r, h)` pairs: `r` is the distance from the axis, and `h` the height along it.
//! Each spline segment is stored as the cubic `A·w³ + B·w² + C·w + D` for `w ∈ [0, 1]`
//! (lower degree splines simply have zero leading coefficients).

use std::sync::Arc;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::{debug, trace, warn};
use valuable::Valuable;

use crate::accel::cylinder_chain::{BoundingCylinder, BoundingCylinderChain};
use crate::core::targets::SHAPE;
use crate::core::types::{Number, Point2, Point3, Vector2, Vector3};
use crate::shape::{Shape, ShapeInstance};
use crate::shared::aabb::{Aabb, HasAabb};
use crate::shared::intersect::{sort_by_dist, HitData, Intersection, IntersectionList};
use crate::shared::interval::Interval;
use crate::shared::math::horner;
use crate::shared::ray::Ray;
use crate::solver::{self, poly, MAX_DISTANCE};

/// Intersections closer than this are ignored
pub const DEPTH_TOLERANCE: Number = 1e-4;
/// Rays with a (normalised) vertical component below this are treated as horizontal
pub const HORIZONTAL_EPSILON: Number = 1e-10;
/// Padding around the segment bounding cylinders
pub const BOUNDS_PADDING: Number = 1e-6;
/// How far off the surface to probe when orienting a normal
const NORMAL_PROBE: Number = 1e-5;

#[derive(Serialize, Deserialize, Display, EnumIter, Copy, Clone, Debug, PartialEq, Eq, Valuable)]
pub enum LatheSplineType {
    /// Straight lines between consecutive points
    Linear,
    /// Quadratic segments through consecutive points; the first point only controls the start tangent
    Quadratic,
    /// Catmull-Rom segments; the first and last points only control the end tangents
    Cubic,
    /// Independent bezier segments of 4 control points each
    Bezier,
}

impl LatheSplineType {
    /// The fewest points a profile of this type can have
    pub fn min_points(&self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Quadratic => 3,
            Self::Cubic | Self::Bezier => 4,
        }
    }

    /// How many segments a profile of `n` points produces
    pub fn segment_count(&self, n: usize) -> usize {
        match self {
            Self::Linear => n.saturating_sub(1),
            Self::Quadratic => n.saturating_sub(2),
            Self::Cubic => n.saturating_sub(3),
            Self::Bezier => n / 4,
        }
    }

    /// Indices of the points where the drawn curve starts and ends
    fn curve_ends(&self, n: usize) -> (usize, usize) {
        match self {
            Self::Linear | Self::Bezier => (0, n - 1),
            Self::Quadratic => (1, n - 1),
            Self::Cubic => (1, n - 2),
        }
    }
}

#[derive(Error, Copy, Clone, Debug, PartialEq, Valuable)]
pub enum LatheInvalidError {
    #[error("{spline} lathe needs at least {min} points, got {count}")]
    TooFewPoints {
        spline: LatheSplineType,
        count: usize,
        min: usize,
    },
    #[error("bezier lathe point count must be a multiple of 4, got {count}")]
    BezierCount { count: usize },
    #[error("point {index} has a negative radius {radius}")]
    NegativeRadius { index: usize, radius: Number },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LatheBuilder {
    pub spline: LatheSplineType,
    /// The profile, as `(radius, height)` points
    pub points: Vec<Point2>,
    /// Whether to solve the segment polynomials with Sturm sequences
    pub sturm: bool,
}

/// One spline segment of the profile, as `A·w³ + B·w² + C·w + D`
#[derive(CopyGetters, Copy, Clone, Debug, PartialEq)]
#[get_copy = "pub"]
pub struct LatheSegment {
    a: Vector2,
    b: Vector2,
    c: Vector2,
    d: Vector2,
}

impl LatheSegment {
    fn new(a: Vector2, b: Vector2, c: Vector2, d: Vector2) -> Self { Self { a, b, c, d } }

    /// The radius polynomial `x(w)`
    pub fn x(&self) -> [Number; 4] { [self.a.x, self.b.x, self.c.x, self.d.x] }

    /// The height polynomial `y(w)`
    pub fn y(&self) -> [Number; 4] { [self.a.y, self.b.y, self.c.y, self.d.y] }

    /// Whether the segment runs along the axis itself. Such a segment has no area and never contributes
    pub fn on_axis(&self) -> bool { self.x().iter().all(|c| c.abs() < HORIZONTAL_EPSILON) }

    /// The profile point at `w`
    pub fn at(&self, w: Number) -> Point2 { Point2::new(horner(&self.x(), w), horner(&self.y(), w)) }

    /// The tangent `(dx/dw, dy/dw)` at `w`
    pub fn tangent(&self, w: Number) -> Vector2 {
        w * (3. * self.a * w + 2. * self.b) + self.c
    }

    /// Parameters in `[0, 1]` where the given coordinate polynomial has a turning point, plus both ends
    fn extreme_params(coeffs: [Number; 4]) -> SmallVec<[Number; 4]> {
        let mut params: SmallVec<[Number; 4]> = SmallVec::from_slice(&[0., 1.]);
        params.extend(
            solver::closed_form::solve_quadratic(3. * coeffs[0], 2. * coeffs[1], coeffs[2])
                .into_iter()
                .filter(|w| (0. ..=1.).contains(w)),
        );
        params
    }

    /// Bounding cylinder of the swept segment
    fn bounds(&self) -> BoundingCylinder {
        let range = |coeffs: [Number; 4]| {
            Self::extreme_params(coeffs)
                .into_iter()
                .map(|w| horner(&coeffs, w))
                .fold((Number::INFINITY, Number::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
        };
        let (r_min, r_max) = range(self.x());
        let (h_min, h_max) = range(self.y());
        BoundingCylinder::new(r_min, r_max, h_min, h_max).padded(BOUNDS_PADDING)
    }
}

/// The shared, immutable part of a lathe
#[derive(Getters, Debug)]
#[get = "pub"]
pub struct LatheData {
    segments: Vec<LatheSegment>,
    bounds: BoundingCylinderChain,
}

#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct LatheShape {
    #[get_copy = "pub"]
    spline: LatheSplineType,
    #[get_copy = "pub"]
    sturm: bool,
    #[get = "pub"]
    data: Arc<LatheData>,
    aabb: Aabb,
}

// region Constructors

impl LatheShape {
    pub fn new(
        spline: LatheSplineType,
        points: impl IntoIterator<Item = impl Into<Point2>>,
    ) -> Result<Self, LatheInvalidError> {
        LatheBuilder {
            spline,
            points: points.into_iter().map(Into::into).collect(),
            sturm: false,
        }
        .try_into()
    }
}

impl TryFrom<LatheBuilder> for LatheShape {
    type Error = LatheInvalidError;

    fn try_from(value: LatheBuilder) -> Result<Self, Self::Error> {
        let LatheBuilder { spline, points, sturm } = value;
        let count = points.len();

        if count < spline.min_points() {
            return Err(LatheInvalidError::TooFewPoints {
                spline,
                count,
                min: spline.min_points(),
            });
        }
        if spline == LatheSplineType::Bezier && count % 4 != 0 {
            return Err(LatheInvalidError::BezierCount { count });
        }
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| p.x < 0.) {
            return Err(LatheInvalidError::NegativeRadius { index, radius: p.x });
        }

        let (first, last) = spline.curve_ends(count);
        let (first, last) = (points[first], points[last]);
        if first != last && !(first.x == 0. && last.x == 0.) {
            warn!(target: SHAPE, ?first, ?last, "lathe profile is open and does not meet the axis, the surface will have a hole");
        }

        let segments = (0..spline.segment_count(count))
            .map(|s| Self::segment(spline, &points, s))
            .collect::<Vec<_>>();
        let bounds = BoundingCylinderChain::new(segments.iter().map(LatheSegment::bounds).collect())
            .ok_or(LatheInvalidError::TooFewPoints {
                spline,
                count,
                min: spline.min_points(),
            })?;

        let whole = bounds.whole();
        let aabb = Aabb::new(
            [-whole.r_max(), whole.h_min(), -whole.r_max()],
            [whole.r_max(), whole.h_max(), whole.r_max()],
        );

        debug!(target: SHAPE, %spline, segments = segments.len(), "built lathe");
        Ok(Self {
            spline,
            sturm,
            data: Arc::new(LatheData { segments, bounds }),
            aabb,
        })
    }
}

impl TryFrom<LatheBuilder> for ShapeInstance {
    type Error = LatheInvalidError;

    fn try_from(value: LatheBuilder) -> Result<Self, Self::Error> { LatheShape::try_from(value).map(Into::into) }
}

impl LatheShape {
    /// Spline coefficients for segment number `s`
    fn segment(spline: LatheSplineType, p: &[Point2], s: usize) -> LatheSegment {
        let zero = Vector2::ZERO;
        match spline {
            LatheSplineType::Linear => LatheSegment::new(zero, zero, p[s + 1] - p[s], p[s]),
            LatheSplineType::Quadratic => {
                let (p0, p1, p2) = (p[s], p[s + 1], p[s + 2]);
                LatheSegment::new(zero, 0.5 * p0 - p1 + 0.5 * p2, 0.5 * (p2 - p0), p1)
            }
            LatheSplineType::Cubic => {
                let (p0, p1, p2, p3) = (p[s], p[s + 1], p[s + 2], p[s + 3]);
                LatheSegment::new(
                    -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3,
                    p0 - 2.5 * p1 + 2. * p2 - 0.5 * p3,
                    0.5 * (p2 - p0),
                    p1,
                )
            }
            LatheSplineType::Bezier => {
                let i = s * 4;
                let (p0, p1, p2, p3) = (p[i], p[i + 1], p[i + 2], p[i + 3]);
                LatheSegment::new(
                    p3 - 3. * p2 + 3. * p1 - p0,
                    3. * p2 - 6. * p1 + 3. * p0,
                    3. * (p1 - p0),
                    p0,
                )
            }
        }
    }
}

// endregion Constructors

// region Shape Impl

impl LatheShape {
    /// Whether a root at `w` belongs to segment `s`. Segment joints are owned by the segment that ends there,
    /// so a ray through a joint is only counted once
    fn owns_param(s: usize, w: Number) -> bool { (w > 0. || (s == 0 && w == 0.)) && w <= 1. }

    /// Solves `y(w) = height` for the segment, keeping only the parameters it owns
    fn params_at_height(s: usize, segment: &LatheSegment, height: Number) -> SmallVec<[Number; 4]> {
        let [a, b, c, d] = segment.y();
        solver::solve_polynomial(&[a, b, c, d - height], false, 0.)
            .into_iter()
            .filter(|&w| Self::owns_param(s, w))
            .collect()
    }

    /// Finds the depths (along the unit direction `dir`) where the ray crosses segment `s`
    fn intersect_segment(
        &self,
        s: usize,
        segment: &LatheSegment,
        pos: Point3,
        dir: Vector3,
        output: &mut SmallVec<[(Number, Number); 8]>,
    ) {
        let r = dir.x * dir.x + dir.z * dir.z;
        let m = dir.x * pos.x + dir.z * pos.z;
        let rho_sqr = pos.x * pos.x + pos.z * pos.z;

        if dir.y.abs() < HORIZONTAL_EPSILON {
            // Horizontal ray: the height fixes `w`, then the radius gives a quadratic in depth
            for w in Self::params_at_height(s, segment, pos.y) {
                let x = horner(&segment.x(), w);
                for t in solver::closed_form::solve_quadratic(r, 2. * m, rho_sqr - x * x) {
                    output.push((t, w));
                }
            }
            return;
        }

        // Height relative to the ray origin, `u(w) = y(w) - Py`, which is `t·Dy` along the ray
        let [ya, yb, yc, yd] = segment.y();
        let u = [ya, yb, yc, yd - pos.y];
        let x = segment.x();
        let dy2 = dir.y * dir.y;

        // r·u² + 2·Dy·m·u + Dy²·ρ² − Dy²·x² = 0
        let coeffs = poly::add(
            &poly::add(&poly::scale(&poly::multiply(&u, &u), r), &poly::scale(&u, 2. * dir.y * m)),
            &poly::add(&[dy2 * rho_sqr], &poly::scale(&poly::multiply(&x, &x), -dy2)),
        );

        for w in solver::solve_polynomial(&coeffs, self.sturm, 0.) {
            if Self::owns_param(s, w) {
                output.push((horner(&u, w) / dir.y, w));
            }
        }
    }

    /// Counts the profile crossings to the outside of `point` at its height
    fn crossings(&self, point: Point3) -> usize {
        let whole = self.data.bounds.whole();
        if point.y < whole.h_min() || point.y > whole.h_max() {
            return 0;
        }
        let rho = point.x.hypot(point.z);

        self.data
            .segments
            .iter()
            .zip(self.data.bounds.segments())
            .enumerate()
            .filter(|(_, (segment, cyl))| !segment.on_axis() && cyl.h_min() <= point.y && point.y <= cyl.h_max())
            .map(|(s, (segment, _))| {
                Self::params_at_height(s, segment, point.y)
                    .into_iter()
                    .filter(|&w| horner(&segment.x(), w) >= rho)
                    .count()
            })
            .sum()
    }
}

impl HasAabb for LatheShape {
    fn aabb(&self) -> Option<Aabb> { Some(self.aabb) }
}

impl Shape for LatheShape {
    fn all_intersections(&self, ray: &Ray, output: &mut IntersectionList) {
        let mut candidates = SmallVec::<[usize; 16]>::new();
        self.data
            .bounds
            .candidates(ray, &Interval::from(DEPTH_TOLERANCE..), &mut candidates);
        if candidates.is_empty() {
            return;
        }

        let len = ray.dir().length();
        let Some(dir) = ray.dir().try_normalize() else {
            return;
        };

        let start = output.len();
        let mut roots = SmallVec::<[(Number, Number); 8]>::new();
        for s in candidates {
            let segment = &self.data.segments[s];
            if segment.on_axis() {
                continue;
            }
            roots.clear();
            self.intersect_segment(s, segment, ray.pos(), dir, &mut roots);

            for &(depth, w) in &roots {
                let t = depth / len;
                if !(t > DEPTH_TOLERANCE && t < MAX_DISTANCE) {
                    trace!(target: SHAPE, t, segment = s, "lathe root out of range");
                    continue;
                }
                output.push(Intersection::new_local(t, ray.at(t), HitData::Lathe { segment: s, w }));
            }
        }
        sort_by_dist(&mut output[start..]);
    }

    fn inside(&self, point: Point3) -> bool { self.crossings(point) % 2 == 1 }

    fn normal(&self, hit: &Intersection) -> Option<Vector3> {
        let HitData::Lathe { segment, w } = hit.data else {
            return None;
        };
        let segment = self.data.segments.get(segment)?;
        let p = hit.pos_l;

        let rho = p.x.hypot(p.z);
        let Vector2 { x: dx, y: dy } = segment.tangent(w);
        let n = if rho < HORIZONTAL_EPSILON {
            Vector3::new(0., -dx, 0.).try_normalize().unwrap_or(Vector3::Y)
        } else {
            Vector3::new(dy * p.x / rho, -dx, dy * p.z / rho).try_normalize()?
        };

        // The profile can be drawn in either direction, so make sure the normal points outwards
        Some(if self.inside(p + n * NORMAL_PROBE) { -n } else { n })
    }
}

// endregion Shape Impl

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A closed cylinder of radius 1 between heights 0 and 2
    fn cylinder() -> LatheShape {
        LatheShape::new(
            LatheSplineType::Linear,
            [[0., 0.], [1., 0.], [1., 2.], [0., 2.], [0., 0.]].map(Point2::from),
        )
        .expect("valid lathe")
    }

    fn depths(shape: &LatheShape, ray: Ray) -> Vec<Number> {
        let mut out = IntersectionList::new();
        shape.all_intersections(&ray, &mut out);
        out.iter().map(|i| i.dist).collect()
    }

    #[test]
    fn slanted_ray_through_cylinder_wall() {
        let d = depths(&cylinder(), Ray::new([-3., 1.5, 0.], [1., -0.1, 0.]));
        assert_eq!(d.len(), 2, "depths: {d:?}");
        let scale = Vector3::new(1., -0.1, 0.).length();
        assert_relative_eq!(d[0], 2. * scale, epsilon = 1e-9);
        assert_relative_eq!(d[1], 4. * scale, epsilon = 1e-9);
    }

    #[test]
    fn horizontal_ray_uses_height_fallback() {
        let d = depths(&cylinder(), Ray::new([-3., 1., 0.], [1., 0., 0.]));
        assert_eq!(d.len(), 2, "depths: {d:?}");
        assert_relative_eq!(d[0], 2., epsilon = 1e-9);
        assert_relative_eq!(d[1], 4., epsilon = 1e-9);
    }

    #[test]
    fn vertical_ray_hits_caps() {
        let d = depths(&cylinder(), Ray::new([0.5, 5., 0.], [0., -1., 0.]));
        assert_eq!(d.len(), 2, "depths: {d:?}");
        assert_relative_eq!(d[0], 3., epsilon = 1e-9);
        assert_relative_eq!(d[1], 5., epsilon = 1e-9);
    }

    #[test]
    fn inside_and_outward_normals() {
        let lathe = cylinder();
        assert!(lathe.inside(Point3::new(0.5, 1., 0.2)));
        assert!(!lathe.inside(Point3::new(1.5, 1., 0.)));
        assert!(!lathe.inside(Point3::new(0., 3., 0.)));

        let mut out = IntersectionList::new();
        lathe.all_intersections(&Ray::new([-3., 1., 0.], [1., 0., 0.]), &mut out);
        assert_relative_eq!(lathe.normal(&out[0]).expect("normal"), Vector3::NEG_X, epsilon = 1e-9);
        assert_relative_eq!(lathe.normal(&out[1]).expect("normal"), Vector3::X, epsilon = 1e-9);
    }

    #[test]
    fn invalid_profiles() {
        assert!(matches!(
            LatheShape::new(LatheSplineType::Cubic, [[1., 0.], [1., 1.], [1., 2.]].map(Point2::from)),
            Err(LatheInvalidError::TooFewPoints { min: 4, .. })
        ));
        assert!(matches!(
            LatheShape::new(LatheSplineType::Bezier, [[1., 0.]; 5].map(Point2::from)),
            Err(LatheInvalidError::BezierCount { count: 5 })
        ));
        assert!(matches!(
            LatheShape::new(LatheSplineType::Linear, [[1., 0.], [-1., 1.]].map(Point2::from)),
            Err(LatheInvalidError::NegativeRadius { index: 1, .. })
        ));
    }

    #[test]
    fn spline_segment_counts() {
        assert_eq!(LatheSplineType::Linear.segment_count(5), 4);
        assert_eq!(LatheSplineType::Quadratic.segment_count(5), 3);
        assert_eq!(LatheSplineType::Cubic.segment_count(5), 2);
        assert_eq!(LatheSplineType::Bezier.segment_count(8), 2);
    }

    #[test]
    fn catmull_rom_passes_through_inner_points() {
        let p = [[0., 0.], [1., 0.], [2., 1.], [2., 3.]].map(Point2::from);
        let seg = LatheShape::segment(LatheSplineType::Cubic, &p, 0);
        assert_relative_eq!(seg.at(0.), p[1]);
        assert_relative_eq!(seg.at(1.), p[2]);
    }
}
