//! Debug-only checks for the invariants the rest of the engine assumes about hits and normals.
//!
//! Release builds skip all of them

use std::borrow::Borrow;

use approx::relative_eq;

use crate::core::types::{Number, Point3, Vector3};
use crate::shared::intersect::Intersection;
use crate::shared::ray::Ray;

macro_rules! debug_assert_only {
    () => {
        if cfg!(not(debug_assertions)) {
            return;
        }
    };
}

pub const EPSILON: Number = 1e-6;
pub const RELATIVE: Number = 1e-3;

/// A depth reported by a shape: finite, and in front of the ray start
#[inline(always)]
#[track_caller]
pub fn depth(dist: Number) {
    debug_assert_only!();
    assert!(dist.is_finite() && dist > 0., "hit depth should be finite and positive; dist: {dist}");
}

#[inline(always)]
#[track_caller]
pub fn point3(p: impl Borrow<Point3>) {
    debug_assert_only!();
    let p = p.borrow();
    assert!(p.is_finite(), "point should be finite; point: {p:?}");
}

/// Normals handed out to callers are always unit length
#[inline(always)]
#[track_caller]
pub fn normal3(n: impl Borrow<Vector3>) {
    debug_assert_only!();
    let n = n.borrow();
    assert!(
        n.is_finite() && n.is_normalized(),
        "normal should be unit length; normal: {n:?}, len: {len}",
        len = n.length()
    );
}

/// The hit lies on the ray, at its reported depth
#[inline(always)]
#[track_caller]
pub fn intersection(ray: impl Borrow<Ray>, hit: impl Borrow<Intersection>) {
    debug_assert_only!();
    let (ray, hit) = (ray.borrow(), hit.borrow());

    depth(hit.dist);
    point3(hit.pos_w);
    point3(hit.pos_l);
    let expected = ray.at(hit.dist);
    assert!(
        relative_eq!(hit.pos_w, expected, epsilon = EPSILON, max_relative = RELATIVE),
        "hit position is not on the ray; pos_w: {pos:?}, ray.at({dist}): {expected:?}, ray: {ray:?}",
        pos = hit.pos_w,
        dist = hit.dist,
    );
}

/// Hit lists are kept in ascending depth order
#[inline(always)]
#[track_caller]
pub fn sorted(list: &[Intersection]) {
    debug_assert_only!();
    if let Some(pair) = list.windows(2).find(|w| w[0].dist > w[1].dist) {
        panic!(
            "hits should be sorted by depth; found {a} before {b} in {all:?}",
            a = pair[0].dist,
            b = pair[1].dist,
            all = list.iter().map(|h| h.dist).collect::<Vec<_>>()
        );
    }
}
