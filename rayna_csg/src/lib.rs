//! Ray intersection for constructive solid geometry
//!
//! Scenes are trees of [object::Object]s. Leaves hold primitive shapes (see [shape]), and interior nodes hold
//! boolean composites of their children (see [csg]). Every object can be transformed, inverted and tagged with a
//! surface; queries return every crossing of a ray with the object's surface, sorted by depth.

pub mod accel;
pub mod core;
pub mod csg;
pub mod object;
pub mod query;
pub mod shape;
pub mod shared;
pub mod solver;
