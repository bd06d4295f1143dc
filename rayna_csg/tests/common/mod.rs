#![allow(dead_code)]

use rayna_csg::core::types::*;
use rayna_csg::csg::{CsgOperation, CsgShape};
use rayna_csg::object::Object;
use rayna_csg::shape::sphere::SphereShape;
use rayna_csg::shared::intersect::IntersectionList;
use rayna_csg::shared::ray::Ray;
use tracing_subscriber::EnvFilter;

pub type Rng = rand::rngs::SmallRng;

/// Seed used for all the property-style tests, so failures are reproducible
pub const SEED: u64 = 0x5EED_CA75;

/// Installs a log subscriber for the test (respecting `RUST_LOG`). Safe to call more than once
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn sphere(centre: impl Into<Point3>, radius: Number) -> Object {
    Object::new(SphereShape::new(centre, radius).expect("valid sphere"))
}

pub fn csg(op: CsgOperation, children: impl IntoIterator<Item = Object>) -> Object {
    Object::new(CsgShape::new(op, children).expect("valid composite"))
}

/// All the hits along the ray (visible or not)
pub fn hits(obj: &Object, ray: &Ray) -> IntersectionList {
    let mut out = IntersectionList::new();
    obj.all_intersections(ray, &mut out);
    out
}

/// Depths of the visible hits along the ray
pub fn depths(obj: &Object, ray: &Ray) -> Vec<Number> {
    hits(obj, ray).iter().filter(|h| h.visible).map(|h| h.dist).collect()
}

/// Checks that each target is inside `obj` exactly when an odd number of surfaces lie between `origin` and it
///
/// `origin` must be outside the object. Targets within `1e-3` of a surface are ambiguous and get skipped.
/// Returns how many targets were actually checked
pub fn check_parity(obj: &Object, origin: Point3, targets: impl IntoIterator<Item = Point3>) -> usize {
    assert!(!obj.inside(origin), "origin {origin} should be outside");
    let mut checked = 0;
    for target in targets {
        let ray = Ray::new(origin, target - origin);
        let t = (target - origin).length();
        let d = depths(obj, &ray);

        if d.iter().any(|&x| (x - t).abs() < 1e-3) {
            continue;
        }
        let before = d.iter().filter(|&&x| x < t).count();
        assert_eq!(before % 2 == 1, obj.inside(target), "target {target}, depths {d:?}");
        checked += 1;
    }
    checked
}
