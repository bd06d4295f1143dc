use rand::{Rng as _, SeedableRng};
use rayna_csg::core::types::*;
use rayna_csg::csg::CsgOperation;
use rayna_csg::query::{trace_batch, BatchTracer};
use rayna_csg::shared::intersect::IntersectionList;
use rayna_csg::shared::pool::{FixedPool, PoolExhaustedError};
use rayna_csg::shared::ray::Ray;

mod common;
use common::*;

fn random_rays(count: usize) -> Vec<Ray> {
    let mut rng = Rng::seed_from_u64(SEED);
    (0..count)
        .map(|_| {
            let origin = Point3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), -10.);
            let target = Point3::new(rng.gen_range(-2.0..3.0), rng.gen_range(-2.0..2.0), rng.gen_range(-1.0..1.0));
            Ray::new(origin, target - origin)
        })
        .collect()
}

#[test]
fn parallel_batch_matches_serial() {
    init_tracing();
    let scene = csg(
        CsgOperation::Merge,
        [
            csg(CsgOperation::Difference, [sphere([0., 0., 0.], 1.5), sphere([0., 0., -1.], 1.)]),
            sphere([2., 0., 0.], 1.),
        ],
    );
    let rays = random_rays(2_000);

    let serial = rays.iter().map(|r| scene.nearest_intersection(r)).collect::<Vec<_>>();
    for parallel in [trace_batch(&scene, &rays), BatchTracer::new(2).trace(&scene, &rays)] {
        assert_eq!(parallel.len(), serial.len());
        for (p, s) in parallel.iter().zip(&serial) {
            assert_eq!(p.map(|h| (h.dist, h.object)), s.map(|h| (h.dist, h.object)));
        }
    }
    assert!(serial.iter().any(Option::is_some));
}

#[test]
fn pool_recycles_scratch_lists() {
    let pool = FixedPool::new(2, IntersectionList::new, IntersectionList::clear);
    let scene = sphere([0., 0., 0.], 1.);
    {
        let mut a = pool.try_acquire().expect("room in the pool");
        let _b = pool.try_acquire().expect("room in the pool");
        scene.all_intersections(&Ray::new([-5., 0., 0.], [1., 0., 0.]), &mut a);
        assert_eq!(a.len(), 2);
        assert_eq!(pool.try_acquire().err(), Some(PoolExhaustedError { capacity: 2 }));
    }
    assert_eq!(pool.in_use(), 0);
    assert!(pool.try_acquire().expect("items were returned").is_empty());
}
