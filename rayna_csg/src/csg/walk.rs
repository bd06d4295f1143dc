//! The inside-count walk, which combines the children's hits along a ray into the composite's hits
//!
//! 1. Every child's hits are merged (by depth) into a single list of events
//! 2. The inside state of each child is sampled once, just before the first event
//! 3. Events are walked in order, in groups of (nearly) coincident depths. Each event flips the inside state of
//!    the child it came from
//! 4. Whenever the composite's predicate differs before and after a group, the group produced a crossing of
//!    the composite's surface, and one of its events is emitted
//!
//! Non-solid children (triangles, polygons) have no inside, so they never change state. Their hits are
//! emitted on their own merit, depending on where they lie relative to the other children.

use itertools::Itertools;
use smallvec::SmallVec;
use tracing::trace;

use crate::core::targets::CSG;
use crate::csg::{CsgOperation, CsgShape};
use crate::shared::intersect::{sort_by_dist, Intersection, IntersectionList};
use crate::shared::ray::Ray;
use crate::shared::validate;

/// A hit from one of the children
#[derive(Copy, Clone, Debug)]
struct Event {
    child: usize,
    hit: Intersection,
}

/// The inside state of each child as the operation sees it, optionally leaving one child out.
/// Subtracted children count as inside when the point is outside them
fn effective(operation: CsgOperation, states: &[bool], skip: Option<usize>) -> impl Iterator<Item = bool> + '_ {
    states
        .iter()
        .enumerate()
        .filter(move |&(i, _)| Some(i) != skip)
        .map(move |(i, &s)| s != (operation.is_difference() && i > 0))
}

/// Whether a hit on the non-solid `child` lies on the composite's surface
fn open_hit_visible(operation: CsgOperation, states: &[bool], child: usize) -> bool {
    let mut others = effective(operation, states, Some(child));
    match operation {
        // Not buried inside any other child
        CsgOperation::Union | CsgOperation::Merge => !others.any(|s| s),
        // Within all the other children
        CsgOperation::Intersection | CsgOperation::Difference => others.all(|s| s),
    }
}

/// Combines the children's hits into the composite's hits, appending them to `output` (sorted by depth)
pub fn walk(csg: &CsgShape, ray: &Ray, output: &mut IntersectionList) {
    let children = csg.children();
    let operation = csg.operation();
    let merge = operation == CsgOperation::Merge;

    let lists = children
        .iter()
        .map(|child| {
            let mut hits = IntersectionList::new();
            child.all_intersections(ray, &mut hits);
            hits
        })
        .collect::<SmallVec<[IntersectionList; 4]>>();

    let events = lists
        .iter()
        .enumerate()
        .map(|(child, hits)| hits.iter().map(move |&hit| Event { child, hit }))
        .kmerge_by(|a, b| a.hit.dist < b.hit.dist)
        // Hidden hits don't change anything, so they are only of interest to a merge
        .filter(|e| e.hit.visible || merge)
        .collect::<SmallVec<[Event; 16]>>();

    let Some(first) = events.first() else {
        return;
    };

    let solid = children.iter().map(|c| c.is_solid()).collect::<SmallVec<[bool; 8]>>();
    let sample = ray.at(first.hit.dist * 0.5);
    let mut states = children.iter().map(|c| c.inside(sample)).collect::<SmallVec<[bool; 8]>>();

    let start = output.len();
    let epsilon = csg.config().coalesce_epsilon;
    let mut group_start = 0;
    while group_start < events.len() {
        let group_depth = events[group_start].hit.dist;
        let group_end = events[group_start..]
            .iter()
            .position(|e| e.hit.dist - group_depth > epsilon)
            .map_or(events.len(), |offset| group_start + offset);
        let group = &events[group_start..group_end];
        group_start = group_end;

        let before_states = states.clone();
        let before = operation.predicate(effective(operation, &before_states, None));
        for e in group.iter().filter(|e| e.hit.visible && solid[e.child]) {
            states[e.child] = !states[e.child];
        }
        let after = operation.predicate(effective(operation, &states, None));

        // The lowest child index whose state actually changed represents the crossing
        let representative = (before != after)
            .then(|| {
                group
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.hit.visible && states[e.child] != before_states[e.child])
                    .min_by_key(|(_, e)| e.child)
                    .map(|(i, _)| i)
            })
            .flatten();

        for (i, e) in group.iter().enumerate() {
            let emitted = if !e.hit.visible {
                false
            } else if solid[e.child] {
                representative == Some(i)
            } else {
                open_hit_visible(operation, &states, e.child)
            };

            if emitted {
                output.push(e.hit);
            } else if merge {
                output.push(Intersection { visible: false, ..e.hit });
            }
        }
    }

    sort_by_dist(&mut output[start..]);
    validate::sorted(&output[start..]);
    trace!(target: CSG, %operation, events = events.len(), emitted = output.len() - start, "composite walk");
}
