use dyn_clone::DynClone;
use std::fmt::Debug;

pub mod aabb;
pub mod intersect;
pub mod interval;
pub mod math;
pub mod pool;
pub mod ray;
pub mod validate;

// NOTE: We have to use [`DynClone`] instead of plain old [`Clone`],
// so that the requirement can also be used for trait objects
dyn_clone::clone_trait_object!(RtRequirement);
/// A simple marker trait that enforces a few other traits we need for anything stored in the object graph.
///
/// `Send + Sync` is what allows the render phase to query the graph from many threads at once
pub trait RtRequirement: DynClone + Debug + Send + Sync {}
impl<T: DynClone + Debug + Send + Sync> RtRequirement for T {}
