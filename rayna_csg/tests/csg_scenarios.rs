use approx::assert_relative_eq;
use rand::{Rng as _, SeedableRng};
use rayna_csg::core::types::*;
use rayna_csg::csg::{CsgConfig, CsgError, CsgOperation, CsgShape};
use rayna_csg::object::{Object, SurfaceId};
use rayna_csg::shape::torus::TorusShape;
use rayna_csg::shared::aabb::HasAabb;
use rayna_csg::shared::ray::Ray;

mod common;
use common::*;

fn x_axis_ray() -> Ray { Ray::new([-5., 0., 0.], [1., 0., 0.]) }

/// Overlapping spheres only show their outer surface: entering the first, exiting the second
#[test]
fn two_sphere_union() {
    init_tracing();
    let union = csg(CsgOperation::Union, [sphere([0., 0., 0.], 1.), sphere([1.5, 0., 0.], 1.)]);
    let d = depths(&union, &x_axis_ray());
    assert_eq!(d.len(), 2, "depths: {d:?}");
    assert_relative_eq!(d[0], 4.);
    assert_relative_eq!(d[1], 7.5);
}

#[test]
fn difference_leaves_a_hole() {
    init_tracing();
    let diff = csg(CsgOperation::Difference, [sphere([0., 0., 0.], 2.), sphere([0., 0., 0.], 1.)]);
    let d = depths(&diff, &x_axis_ray());
    assert_eq!(d.len(), 4, "depths: {d:?}");
    for (got, expected) in d.iter().zip([3., 4., 6., 7.]) {
        assert_relative_eq!(*got, expected);
    }

    // The wall of the hole faces into the hole
    let hits = hits(&diff, &x_axis_ray());
    assert_relative_eq!(diff.normal(&hits[0]).expect("normal"), Vector3::NEG_X);
    assert_relative_eq!(diff.normal(&hits[1]).expect("normal"), Vector3::X);
    assert_relative_eq!(diff.normal(&hits[2]).expect("normal"), Vector3::NEG_X);
    assert_relative_eq!(diff.normal(&hits[3]).expect("normal"), Vector3::X);
}

#[test]
fn intersection_of_overlapping_spheres() {
    let lens = csg(CsgOperation::Intersection, [sphere([0., 0., 0.], 1.), sphere([1.5, 0., 0.], 1.)]);
    let d = depths(&lens, &x_axis_ray());
    assert_eq!(d.len(), 2, "depths: {d:?}");
    assert_relative_eq!(d[0], 5.5);
    assert_relative_eq!(d[1], 6.);
}

#[test]
fn merge_keeps_internal_surfaces_hidden() {
    let merged = csg(CsgOperation::Merge, [sphere([0., 0., 0.], 1.), sphere([1.5, 0., 0.], 1.)]);
    let all = hits(&merged, &x_axis_ray());
    let summary = all.iter().map(|h| (h.dist, h.visible)).collect::<Vec<_>>();
    assert_eq!(summary, vec![(4., true), (5.5, false), (6., false), (7.5, true)]);
    assert_relative_eq!(merged.nearest_depth(&x_axis_ray()).expect("hit"), 4.);
}

/// Touching spheres share a single point on the ray, which must not create a zero-length gap
#[test]
fn tangent_spheres_do_not_split() {
    let union = csg(CsgOperation::Union, [sphere([0., 0., 0.], 1.), sphere([2., 0., 0.], 1.)]);
    assert_eq!(depths(&union, &x_axis_ray()), vec![4., 8.]);

    let touching = csg(CsgOperation::Intersection, [sphere([0., 0., 0.], 1.), sphere([2., 0., 0.], 1.)]);
    assert!(depths(&touching, &x_axis_ray()).is_empty());
}

#[test]
fn disjoint_children_give_empty_results() {
    let a = || sphere([0., 0., 0.], 1.);
    let b = || sphere([10., 0., 0.], 1.);
    // Passes between both spheres
    let between = Ray::new([5., -5., 0.], [0., 1., 0.]);

    for op in [CsgOperation::Union, CsgOperation::Intersection, CsgOperation::Difference, CsgOperation::Merge] {
        assert!(hits(&csg(op, [a(), b()]), &between).is_empty(), "{op}");
    }

    let meet = csg(CsgOperation::Intersection, [a(), b()]);
    assert_eq!(meet.aabb(), None);
    assert!(hits(&meet, &x_axis_ray()).is_empty());
}

#[test]
fn inside_matches_the_boolean_definition() {
    let mut rng = Rng::seed_from_u64(SEED);
    let a = sphere([0., 0., 0.], 1.);
    let b = sphere([0.8, 0.3, 0.], 1.2);
    let union = csg(CsgOperation::Union, [a.copy(), b.copy()]);
    let meet = csg(CsgOperation::Intersection, [a.copy(), b.copy()]);
    let diff = csg(CsgOperation::Difference, [a.copy(), b.copy()]);

    for _ in 0..2_000 {
        let p = Point3::new(rng.gen_range(-2.5..2.5), rng.gen_range(-2.5..2.5), rng.gen_range(-2.5..2.5));
        let (ia, ib) = (a.inside(p), b.inside(p));
        assert_eq!(union.inside(p), ia || ib, "union at {p}");
        assert_eq!(meet.inside(p), ia && ib, "intersection at {p}");
        assert_eq!(diff.inside(p), ia && !ib, "difference at {p}");
    }
}

/// Along a ray starting outside, a point is inside exactly when an odd number of surfaces lie before it
#[test]
fn odd_crossing_parity() {
    init_tracing();
    let mut rng = Rng::seed_from_u64(SEED);

    let mut ring = Object::new(TorusShape::new(2., 0.5).expect("valid torus"));
    ring.rotate([90., 0., 0.]);
    let scene = csg(
        CsgOperation::Union,
        [
            csg(CsgOperation::Difference, [sphere([0., 0., 0.], 1.5), sphere([0.5, 0.5, 0.], 0.8)]),
            ring,
            csg(CsgOperation::Intersection, [sphere([3., 1., 0.], 1.), sphere([3.5, 1., 0.], 1.)]),
        ],
    );

    let targets = (0..1_000)
        .map(|_| Point3::new(rng.gen_range(-3.0..4.5), rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0)))
        .collect::<Vec<_>>();
    let checked = check_parity(&scene, Point3::new(-12., 0.37, 0.81), targets);
    assert!(checked > 900);
}

#[test]
fn nesting_depth_is_limited() {
    let config = CsgConfig {
        max_depth: 3,
        ..CsgConfig::default()
    };
    let two_deep = csg(CsgOperation::Union, [csg(CsgOperation::Union, [sphere([0., 0., 0.], 1.)])]);
    assert_eq!(two_deep.depth(), 3);
    assert_eq!(
        CsgShape::with_config(CsgOperation::Union, [two_deep.copy()], config).err(),
        Some(CsgError::DepthExceeded { depth: 4, max: 3 })
    );
    assert!(CsgShape::with_config(CsgOperation::Union, [sphere([0., 0., 0.], 1.)], config).is_ok());
}

#[test]
fn innermost_surface_wins() {
    let a = sphere([0., 0., 0.], 1.).with_surface(SurfaceId(1));
    let b = sphere([5., 0., 0.], 1.);
    let (a_id, b_id) = (a.id(), b.id());
    let group = csg(CsgOperation::Union, [a, b]).with_surface(SurfaceId(9));

    let hits = hits(&group, &x_axis_ray());
    assert_eq!(hits.len(), 4);

    let first = group.determine_surface(&hits[0]).expect("hit belongs to the group");
    assert_eq!(first.leaf, a_id);
    assert_eq!(first.surface, Some(SurfaceId(1)));

    let last = group.determine_surface(&hits[3]).expect("hit belongs to the group");
    assert_eq!(last.leaf, b_id);
    assert_eq!(last.surface, Some(SurfaceId(9)));
    assert_relative_eq!(last.pos_w, Point3::new(6., 0., 0.));

    let stranger = sphere([0., 0., 0.], 1.);
    let foreign = stranger.nearest_intersection(&x_axis_ray()).expect("ray hits the sphere");
    assert_eq!(group.determine_surface(&foreign), None);
}
