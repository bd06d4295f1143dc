//! # Module [crate::accel]
//!
//! Bounding volume hierarchies used inside individual shapes, to skip sub-element tests for rays that obviously
//! can't hit them. Objects themselves are pruned by their [crate::shared::aabb::Aabb].
//!
//! - [sphere_tree]: a tree of bounding spheres, for blob elements
//! - [cylinder_chain]: a list of thick bounding cylinders, for lathe segments

pub mod cylinder_chain;
pub mod sphere_tree;
