//! Parallel ray queries over a (read-only) object graph
//!
//! Objects are `Send + Sync`, and all queries take `&self`, so a batch of rays can be traced on the rayon global
//! pool without any locking. Each ray needs a scratch [IntersectionList]; these are recycled through a
//! [FixedPool], falling back to a fresh allocation whenever the pool runs dry.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::core::targets::QUERY;
use crate::object::Object;
use crate::shared::intersect::{Intersection, IntersectionList};
use crate::shared::pool::FixedPool;
use crate::shared::ray::Ray;

/// Traces rays in parallel, keeping a pool of scratch lists alive between batches
#[derive(Debug)]
pub struct BatchTracer {
    scratch: FixedPool<IntersectionList>,
}

impl BatchTracer {
    /// Creates a tracer whose pool holds at most `capacity` scratch lists
    pub fn new(capacity: usize) -> Self {
        Self {
            scratch: FixedPool::new(capacity, IntersectionList::new, IntersectionList::clear),
        }
    }

    /// The nearest visible hit for each ray, in the same order as `rays`
    pub fn trace(&self, object: &Object, rays: &[Ray]) -> Vec<Option<Intersection>> {
        let hits = rays
            .par_iter()
            .map(|ray| match self.scratch.try_acquire() {
                Ok(mut scratch) => object.nearest_in(ray, &mut scratch),
                Err(err) => {
                    trace!(target: QUERY, ?err, "falling back to a fresh scratch list");
                    object.nearest_in(ray, &mut IntersectionList::new())
                }
            })
            .collect::<Vec<_>>();

        debug!(
            target: QUERY,
            object = %object.id(),
            rays = rays.len(),
            hits = hits.iter().filter(|h| h.is_some()).count(),
            "traced batch"
        );
        hits
    }
}

impl Default for BatchTracer {
    fn default() -> Self { Self::new(rayon::current_num_threads()) }
}

/// Traces a batch of rays on the global rayon pool, returning the nearest visible hit per ray
pub fn trace_batch(object: &Object, rays: &[Ray]) -> Vec<Option<Intersection>> { BatchTracer::default().trace(object, rays) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere::SphereShape;

    #[test]
    fn tiny_pool_still_traces_every_ray() {
        let obj = Object::new(SphereShape::new([0., 0., 0.], 1.).expect("valid sphere"));
        let rays = (0..64)
            .map(|i| Ray::new([-5., (i as f64 - 32.) / 20., 0.], [1., 0., 0.]))
            .collect::<Vec<_>>();
        let hits = BatchTracer::new(1).trace(&obj, &rays);
        assert_eq!(hits.len(), rays.len());
        for (ray, hit) in rays.iter().zip(&hits) {
            assert_eq!(hit.is_some(), ray.pos().y.abs() < 1.);
        }
    }
}
